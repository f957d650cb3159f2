use persistkit::{
    Filters, LangString, ManualClock, MemoryRecordStore, PersistError, PersistSession, Persistent,
    PersistentModel, PropertyDefinition, PropertyType, Record, RecordStore, SelectParams,
    SortOrder, Value, persistent_accessors,
};
use std::sync::Arc;

struct Plan;

impl PersistentModel for Plan {
    const TABLE: &'static str = "competency_plan";

    fn properties_definition() -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::text("name")
                .default_value("")
                .validator(|value, _| match value.as_str() {
                    Some(name) if !name.trim().is_empty() => Ok(()),
                    _ => Err(LangString::new("invalidname", "tool_lp")),
                }),
            PropertyDefinition::integer("userid").default_value(0),
            PropertyDefinition::integer("status")
                .default_value(0)
                .choices([0, 1, 2]),
            PropertyDefinition::text("description").nullable(),
            PropertyDefinition::new("code", PropertyType::AlphaNumExt).default_value("plan-1"),
        ]
    }
}

persistent_accessors!(trait PlanFields for Plan {
    name: String,
    userid: i64,
    status: i64,
    description: Option<String>,
});

struct BrokenValidator;

impl PersistentModel for BrokenValidator {
    const TABLE: &'static str = "broken_validator";

    fn properties_definition() -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::text("name")
            .default_value("x")
            .validator(|_, _| Err(LangString::new("", "tool_lp")))]
    }
}

struct ReservedName;

impl PersistentModel for ReservedName {
    const TABLE: &'static str = "reserved_name";

    fn properties_definition() -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::integer("timecreated")]
    }
}

fn session_at(now: i64) -> (PersistSession, Arc<MemoryRecordStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryRecordStore::new());
    let clock = Arc::new(ManualClock::new(now));
    let session = PersistSession::new(store.clone())
        .with_clock(clock.clone())
        .with_actor(2);
    (session, store, clock)
}

fn named_plan(name: &str) -> Persistent<Plan> {
    let mut plan = Persistent::<Plan>::new().unwrap();
    plan.set("name", name).unwrap();
    plan.set("userid", 7).unwrap();
    plan
}

#[test]
fn test_defaults_materialize_without_set() {
    let mut plan = Persistent::<Plan>::new().unwrap();
    assert_eq!(plan.get("name").unwrap(), Value::from(""));
    assert_eq!(plan.get("status").unwrap(), Value::Integer(0));
    assert_eq!(plan.get("code").unwrap(), Value::from("plan-1"));
    assert!(plan.get("description").unwrap().is_null());
    assert_eq!(plan.get("id").unwrap(), Value::Integer(0));
    assert_eq!(plan.property_default("status").unwrap(), Value::Integer(0));
}

#[test]
fn test_set_then_get_returns_value() {
    let mut plan = Persistent::<Plan>::new().unwrap();
    plan.set("name", "Learning plan").unwrap();
    plan.set("status", 2).unwrap();
    assert_eq!(plan.get("name").unwrap(), Value::from("Learning plan"));
    assert_eq!(plan.get_status().unwrap(), 2);

    plan.set_description(Some("Quarterly goals".to_string())).unwrap();
    assert_eq!(plan.get_description().unwrap().as_deref(), Some("Quarterly goals"));
}

#[test]
fn test_unknown_property_is_programming_error() {
    let mut plan = Persistent::<Plan>::new().unwrap();
    let err = plan.get("colour").unwrap_err();
    assert!(matches!(err, PersistError::UnknownProperty { ref property, .. } if property == "colour"));
    assert!(err.is_programming_error());
    assert!(!plan.has_property("colour"));
    assert!(plan.has_property("usermodified"));
}

#[test]
fn test_required_name_scenario() {
    let mut plan = Persistent::<Plan>::new().unwrap();
    plan.set("name", "").unwrap();
    assert!(!plan.is_valid().unwrap());
    let errors = plan.errors().unwrap();
    assert_eq!(errors.get("name"), Some(&LangString::new("invalidname", "tool_lp")));

    plan.set("name", "Alice").unwrap();
    assert!(plan.is_valid().unwrap());
    assert!(plan.errors().unwrap().is_empty());
}

#[test]
fn test_validate_is_cached_until_value_changes() {
    let mut plan = named_plan("");
    let first = plan.validate().unwrap();
    let second = plan.validate().unwrap();
    assert_eq!(first, second);
    assert!(plan.is_validated());

    plan.set("name", "").unwrap();
    assert!(plan.is_validated());

    plan.set("name", "Bob").unwrap();
    assert!(!plan.is_validated());
    assert!(plan.validate().unwrap().is_valid());
}

#[test]
fn test_null_rematerializes_default_unless_nullable() {
    let mut plan = named_plan("Plan");
    plan.set("userid", Value::Null).unwrap();
    assert_eq!(plan.get("userid").unwrap(), Value::Integer(0));

    plan.set("description", Value::Null).unwrap();
    assert_eq!(plan.get("description").unwrap(), Value::Null);
}

#[tokio::test]
async fn test_loosely_equal_value_of_wrong_type_invalidates() {
    let (session, store, _) = session_at(100);
    let mut plan = named_plan("Plan");
    plan.set("status", 1).unwrap();
    assert!(plan.is_valid().unwrap());

    plan.set("status", "1").unwrap();
    assert!(plan.is_validated());

    plan.set("status", "1.0").unwrap();
    assert!(!plan.is_validated());
    assert!(!plan.is_valid().unwrap());

    let err = plan.create(&session).await.unwrap_err();
    assert!(err.validation_errors().unwrap().contains("status"));
    assert_eq!(store.row_count(Plan::TABLE).await, 0);
}

#[test]
fn test_type_and_choice_failures_use_default_message() {
    let mut plan = named_plan("Plan");
    plan.set("status", 5).unwrap();
    plan.set("userid", "seven").unwrap();
    plan.set("code", "has space").unwrap();

    let errors = plan.errors().unwrap();
    assert_eq!(errors.get("status"), Some(&LangString::invalid_data()));
    assert_eq!(errors.get("userid"), Some(&LangString::invalid_data()));
    assert_eq!(errors.get("code"), Some(&LangString::invalid_data()));
    assert!(!errors.contains("name"));
}

#[test]
fn test_numeric_text_matches_choice() {
    let mut plan = named_plan("Plan");
    plan.set("status", "1").unwrap();
    assert!(plan.is_valid().unwrap());
}

#[test]
fn test_record_round_trip() {
    let mut plan = named_plan("Round trip");
    plan.set("description", "notes").unwrap();
    let record = plan.to_record().unwrap();

    let keys: Vec<_> = record.keys().collect();
    assert_eq!(
        keys,
        vec![
            "name",
            "userid",
            "status",
            "description",
            "code",
            "id",
            "timecreated",
            "timemodified",
            "usermodified"
        ]
    );

    let mut copy = Persistent::<Plan>::with_record(record.clone()).unwrap();
    assert_eq!(copy.to_record().unwrap(), record);
    assert!(!copy.is_validated());
}

#[test]
fn test_broken_validator_result() {
    let mut broken = Persistent::<BrokenValidator>::new().unwrap();
    let err = broken.validate().unwrap_err();
    assert!(matches!(err, PersistError::InvalidValidatorResult { ref property, .. } if property == "name"));
    assert!(!broken.is_validated());
}

#[test]
fn test_reserved_property_rejected_at_schema_build() {
    let err = Persistent::<ReservedName>::new().unwrap_err();
    assert!(matches!(err, PersistError::InvalidDefinition { ref property, .. } if property == "timecreated"));
}

#[tokio::test]
async fn test_create_invalid_writes_nothing() {
    let (session, store, _) = session_at(100);
    let mut plan = named_plan("");

    let err = plan.create(&session).await.unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert!(errors.contains("name"));
    assert!(!err.is_programming_error());
    assert_eq!(store.row_count(Plan::TABLE).await, 0);
    assert_eq!(plan.id().unwrap(), 0);
}

#[tokio::test]
async fn test_create_assigns_id_and_stamps() {
    let (session, store, _) = session_at(1_000);
    let mut plan = named_plan("Created");
    plan.set("id", 55).unwrap();
    plan.create(&session).await.unwrap();

    assert_eq!(plan.id().unwrap(), 1);
    assert_eq!(plan.time_created().unwrap(), 1_000);
    assert_eq!(plan.time_modified().unwrap(), 1_000);
    assert_eq!(plan.user_modified().unwrap(), 2);
    assert!(plan.is_validated());

    let stored = store
        .get_record(Plan::TABLE, &Filters::by_id(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Created")));
    assert_eq!(stored.get("usermodified"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn test_update_refreshes_modified_and_keeps_created() {
    let (session, store, clock) = session_at(100);
    let mut plan = named_plan("Original");
    plan.create(&session).await.unwrap();

    clock.advance(50);
    plan.set("name", "Renamed").unwrap();
    plan.set("timecreated", 5).unwrap();
    assert!(plan.update(&session).await.unwrap());
    assert!(plan.is_validated());
    assert!(plan.time_modified().unwrap() >= 100);

    let stored = store
        .get_record(Plan::TABLE, &Filters::by_id(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Renamed")));
    assert_eq!(stored.get("timecreated"), Some(&Value::Integer(100)));
    assert_eq!(stored.get("timemodified"), Some(&Value::Integer(150)));
}

#[tokio::test]
async fn test_update_requires_id_and_validity() {
    let (session, _, _) = session_at(100);
    let mut transient = named_plan("Transient");
    let err = transient.update(&session).await.unwrap_err();
    assert!(matches!(err, PersistError::RequiresId { ref operation, .. } if operation == "update"));

    let mut plan = named_plan("Stored");
    plan.create(&session).await.unwrap();
    plan.set("name", "  ").unwrap();
    let err = plan.update(&session).await.unwrap_err();
    assert!(matches!(err, PersistError::InvalidPersistent { .. }));
}

#[tokio::test]
async fn test_read_and_load() {
    let (session, _, _) = session_at(300);
    let mut plan = named_plan("Readable");
    plan.create(&session).await.unwrap();

    let mut loaded = Persistent::<Plan>::load(&session, 1).await.unwrap();
    assert!(loaded.is_validated());
    assert_eq!(loaded.get_name().unwrap(), "Readable");
    assert_eq!(loaded.time_created().unwrap(), 300);

    let missing = Persistent::<Plan>::load(&session, 42).await.unwrap_err();
    assert!(matches!(missing, PersistError::NotFound { id: 42, .. }));

    let mut transient = Persistent::<Plan>::new().unwrap();
    let err = transient.read(&session).await.unwrap_err();
    assert!(matches!(err, PersistError::RequiresId { .. }));
}

#[tokio::test]
async fn test_delete_detaches_instance() {
    let (session, store, _) = session_at(100);
    let mut plan = named_plan("Doomed");
    plan.create(&session).await.unwrap();

    assert!(plan.delete(&session).await.unwrap());
    assert!(plan.is_detached());
    assert_eq!(store.row_count(Plan::TABLE).await, 0);
    assert_eq!(plan.get_name().unwrap(), "Doomed");

    for err in [
        plan.update(&session).await.unwrap_err(),
        plan.delete(&session).await.unwrap_err(),
    ] {
        assert!(matches!(err, PersistError::Detached { id: 1, .. }));
    }
    assert!(matches!(
        plan.read(&session).await.unwrap_err(),
        PersistError::Detached { .. }
    ));

    plan.create(&session).await.unwrap();
    assert!(!plan.is_detached());
    assert_eq!(plan.id().unwrap(), 2);
}

#[tokio::test]
async fn test_changing_id_leaves_detached_state() {
    let (session, _, _) = session_at(100);
    let mut first = named_plan("First");
    first.create(&session).await.unwrap();
    let mut second = named_plan("Second");
    second.create(&session).await.unwrap();

    first.delete(&session).await.unwrap();
    first.set("id", 2).unwrap();
    assert!(!first.is_detached());
    first.read(&session).await.unwrap();
    assert_eq!(first.get_name().unwrap(), "Second");
}

#[tokio::test]
async fn test_delete_of_missing_record() {
    let (session, _, _) = session_at(100);
    let mut plan = named_plan("Never stored");
    plan.set("id", 9).unwrap();
    assert!(!plan.delete(&session).await.unwrap());
    assert!(!plan.is_detached());
}

#[tokio::test]
async fn test_static_queries() {
    let (session, _, _) = session_at(100);
    for (name, status) in [("Charlie", 1), ("Alice", 1), ("Bob", 2)] {
        let mut plan = named_plan(name);
        plan.set("status", status).unwrap();
        plan.create(&session).await.unwrap();
    }

    let mut active = Persistent::<Plan>::get_records(
        &session,
        &Filters::new().eq("status", 1),
        "name",
        SortOrder::Asc,
        0,
        0,
    )
    .await
    .unwrap();
    let names: Vec<_> = active.iter_mut().map(|p| p.get_name().unwrap()).collect();
    assert_eq!(names, vec!["Alice", "Charlie"]);
    assert!(active.iter().all(|p| !p.is_validated()));

    let page = Persistent::<Plan>::get_records(&session, &Filters::new(), "name", SortOrder::Desc, 1, 1)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);

    let mut selected = Persistent::<Plan>::get_records_select(
        &session,
        "status = :status OR name LIKE ?",
        &SelectParams::named([("status", Value::from(2))]),
        "",
        "*",
        0,
        0,
    )
    .await;
    assert!(matches!(selected, Err(PersistError::Parse(_))));

    selected = Persistent::<Plan>::get_records_select(
        &session,
        "status = :status OR name LIKE :pattern",
        &SelectParams::named([("status", Value::from(2)), ("pattern", Value::from("Ch%"))]),
        "name ASC",
        "*",
        0,
        0,
    )
    .await;
    let mut selected = selected.unwrap();
    let names: Vec<_> = selected.iter_mut().map(|p| p.get_name().unwrap()).collect();
    assert_eq!(names, vec!["Bob", "Charlie"]);

    assert_eq!(Persistent::<Plan>::count_records(&session, &Filters::new()).await.unwrap(), 3);
    assert_eq!(
        Persistent::<Plan>::count_records_select(
            &session,
            "status >= ? AND userid = ?",
            &SelectParams::positional([2, 7]),
        )
        .await
        .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_hydrate_from_foreign_record() {
    let record = Record::new().with("name", "Imported").with("status", 2).with("id", 12);
    let mut plan = Persistent::<Plan>::with_record(record).unwrap();
    assert_eq!(plan.id().unwrap(), 12);
    assert_eq!(plan.get_status().unwrap(), 2);

    let bad = Record::new().with("unknown", 1);
    assert!(Persistent::<Plan>::with_record(bad).is_err());
}
