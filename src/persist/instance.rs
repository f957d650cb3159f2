use super::definition::PropertyValues;
use super::schema::{
    ID, ModelSchema, PersistentModel, TIME_CREATED, TIME_MODIFIED, USER_MODIFIED,
};
use super::session::PersistSession;
use super::validation::{Validation, ValidationErrors};
use crate::core::{FromValue, LangString, PersistError, Result, Value};
use crate::storage::{Filters, Record, SelectParams, SortOrder};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One instance of model `M`, bound to at most one record of `M::TABLE`.
pub struct Persistent<M: PersistentModel> {
    schema: Arc<ModelSchema>,
    data: HashMap<String, Value>,
    errors: ValidationErrors,
    validated: bool,
    detached: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: PersistentModel> Persistent<M> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: ModelSchema::of::<M>()?,
            data: HashMap::new(),
            errors: ValidationErrors::new(),
            validated: false,
            detached: false,
            _model: PhantomData,
        })
    }

    /// Instance hydrated from `record`. Not validated.
    pub fn with_record(record: Record) -> Result<Self> {
        let mut instance = Self::new()?;
        instance.from_record(record)?;
        Ok(instance)
    }

    /// Instance read from the store by id.
    pub async fn load(session: &PersistSession, id: i64) -> Result<Self> {
        let mut instance = Self::new()?;
        instance.set(ID, id)?;
        instance.read(session).await?;
        Ok(instance)
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.schema.has_property(property)
    }

    pub fn property_default(&self, property: &str) -> Result<Value> {
        self.schema.default_value(property)
    }

    pub fn property_error_message(&self, property: &str) -> Result<LangString> {
        self.schema.error_message(property)
    }

    /// Current value, materializing the declared default on first access.
    /// A stored `Null` counts as unset unless the property is nullable.
    pub fn get(&mut self, property: &str) -> Result<Value> {
        let nullable = self.schema.require(property)?.is_nullable();
        let default = match self.data.get(property) {
            Some(value) if nullable || !value.is_null() => return Ok(value.clone()),
            _ => self.schema.default_value(property)?,
        };
        self.set(property, default.clone())?;
        Ok(default)
    }

    pub fn get_as<T: FromValue>(&mut self, property: &str) -> Result<T> {
        let value = self.get(property)?;
        T::from_value(property, value)
    }

    /// Overwrites `property`. The cached validation survives only a loosely
    /// equal value that still passes the property's type check.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let accepted = self.schema.require(property)?.accepts(&value);

        let changed = !accepted
            || self
                .data
                .get(property)
                .is_none_or(|current| !current.loose_eq(&value));
        if changed {
            self.validated = false;
            if property == ID && self.detached {
                self.detached = false;
            }
        }
        self.data.insert(property.to_string(), value);
        Ok(())
    }

    /// Applies every field of `record` through `set`, in input order.
    pub fn from_record(&mut self, record: Record) -> Result<&mut Self> {
        for (property, value) in record {
            self.set(&property, value)?;
        }
        Ok(self)
    }

    /// Every declared property, in schema order.
    pub fn to_record(&mut self) -> Result<Record> {
        let schema = self.schema.clone();
        let mut record = Record::new();
        for name in schema.property_names() {
            record.insert(name, self.get(name)?);
        }
        Ok(record)
    }

    pub async fn read(&mut self, session: &PersistSession) -> Result<&mut Self> {
        let id = self.require_id("read")?;
        self.ensure_attached(id, "read")?;

        let record = session
            .store()
            .get_record(M::TABLE, &Filters::by_id(id))
            .await?
            .ok_or_else(|| PersistError::NotFound {
                table: M::TABLE.to_string(),
                id,
            })?;
        log::debug!("read {} {} from '{}'", self.schema.model(), id, M::TABLE);

        self.from_record(record)?;
        self.validated = true;
        self.errors = ValidationErrors::new();
        Ok(self)
    }

    pub async fn create(&mut self, session: &PersistSession) -> Result<&mut Self> {
        self.ensure_valid("create")?;

        let now = session.now();
        self.set(ID, 0)?;
        self.set(TIME_CREATED, now)?;
        self.set(TIME_MODIFIED, now)?;
        self.set(USER_MODIFIED, session.actor_id())?;

        let record = self.to_record()?;
        let id = session.store().insert_record(M::TABLE, record).await?;
        log::debug!("created {} {} in '{}'", self.schema.model(), id, M::TABLE);

        self.set(ID, id)?;
        self.detached = false;
        self.validated = true;
        Ok(self)
    }

    /// Writes the current values. `timecreated` is never rewritten.
    pub async fn update(&mut self, session: &PersistSession) -> Result<bool> {
        let id = self.require_id("update")?;
        self.ensure_attached(id, "update")?;
        self.ensure_valid("update")?;

        self.set(TIME_MODIFIED, session.now())?;
        self.set(USER_MODIFIED, session.actor_id())?;

        let mut record = self.to_record()?;
        record.remove(TIME_CREATED);
        let updated = session.store().update_record(M::TABLE, record).await?;
        log::debug!(
            "updated {} {} in '{}': {}",
            self.schema.model(),
            id,
            M::TABLE,
            updated
        );

        self.validated = true;
        Ok(updated)
    }

    /// Deletes the record. In-memory values are kept; on success the
    /// instance is detached.
    pub async fn delete(&mut self, session: &PersistSession) -> Result<bool> {
        let id = self.require_id("delete")?;
        self.ensure_attached(id, "delete")?;

        let deleted = session
            .store()
            .delete_records(M::TABLE, &Filters::by_id(id))
            .await?;
        log::debug!(
            "deleted {} {} from '{}': {}",
            self.schema.model(),
            id,
            M::TABLE,
            deleted
        );

        if deleted {
            self.detached = true;
        }
        Ok(deleted)
    }

    pub fn validate(&mut self) -> Result<Validation> {
        if self.validated {
            return Ok(Validation::from_errors(self.errors.clone()));
        }

        let schema = self.schema.clone();
        for name in schema.property_names() {
            self.get(name)?;
        }

        let mut errors = ValidationErrors::new();
        let values = PropertyValues::new(&self.data);
        for definition in schema.properties() {
            let name = definition.name();
            let value = values.get_or_null(name);

            if !definition.accepts(&value) {
                errors.insert(name, definition.error_message());
                continue;
            }

            if let Some(choices) = definition.allowed_values() {
                if !choices.iter().any(|choice| choice.loose_eq(&value)) {
                    errors.insert(name, definition.error_message());
                    continue;
                }
            }

            if let Some(validator) = definition.custom_validator() {
                if let Err(message) = (**validator)(&value, &values) {
                    if message.is_empty() {
                        return Err(PersistError::InvalidValidatorResult {
                            model: schema.model().to_string(),
                            property: name.to_string(),
                        });
                    }
                    errors.insert(name, message);
                }
            }
        }

        self.errors = errors;
        self.validated = true;
        Ok(Validation::from_errors(self.errors.clone()))
    }

    pub fn is_valid(&mut self) -> Result<bool> {
        Ok(self.validate()?.is_valid())
    }

    /// Errors of the last validation, validating first if needed.
    pub fn errors(&mut self) -> Result<ValidationErrors> {
        self.validate()?;
        Ok(self.errors.clone())
    }

    /// Whether the cached validation result is current.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn id(&mut self) -> Result<i64> {
        self.get_as(ID)
    }

    pub fn time_created(&mut self) -> Result<i64> {
        self.get_as(TIME_CREATED)
    }

    pub fn time_modified(&mut self) -> Result<i64> {
        self.get_as(TIME_MODIFIED)
    }

    pub fn user_modified(&mut self) -> Result<i64> {
        self.get_as(USER_MODIFIED)
    }

    /// Instances for the records matching `filters`. Empty `sort` keeps
    /// store order; `limit` 0 means no limit.
    pub async fn get_records(
        session: &PersistSession,
        filters: &Filters,
        sort: &str,
        order: SortOrder,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Self>> {
        let sort = if sort.trim().is_empty() {
            String::new()
        } else {
            format!("{} {}", sort.trim(), order.as_sql())
        };
        let records = session
            .store()
            .get_records(M::TABLE, filters, &sort, "*", skip, limit)
            .await?;
        records.into_iter().map(Self::with_record).collect()
    }

    pub async fn get_records_select(
        session: &PersistSession,
        select: &str,
        params: &SelectParams,
        sort: &str,
        fields: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Self>> {
        let records = session
            .store()
            .get_records_select(M::TABLE, select, params, sort, fields, skip, limit)
            .await?;
        records.into_iter().map(Self::with_record).collect()
    }

    pub async fn count_records(session: &PersistSession, filters: &Filters) -> Result<u64> {
        session.store().count_records(M::TABLE, filters).await
    }

    pub async fn count_records_select(
        session: &PersistSession,
        select: &str,
        params: &SelectParams,
    ) -> Result<u64> {
        session
            .store()
            .count_records_select(M::TABLE, select, params)
            .await
    }

    fn current_id(&self) -> i64 {
        self.data.get(ID).and_then(Value::as_i64).unwrap_or(0)
    }

    fn require_id(&self, operation: &str) -> Result<i64> {
        let id = self.current_id();
        if id <= 0 {
            return Err(PersistError::RequiresId {
                model: self.schema.model().to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(id)
    }

    fn ensure_attached(&self, id: i64, operation: &str) -> Result<()> {
        if self.detached {
            return Err(PersistError::Detached {
                model: self.schema.model().to_string(),
                id,
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_valid(&mut self, operation: &str) -> Result<()> {
        if let Validation::Invalid(errors) = self.validate()? {
            log::warn!(
                "refusing to {} invalid {}: {}",
                operation,
                self.schema.model(),
                errors
            );
            return Err(PersistError::InvalidPersistent {
                model: self.schema.model().to_string(),
                errors,
            });
        }
        Ok(())
    }
}

impl<M: PersistentModel> Clone for Persistent<M> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            data: self.data.clone(),
            errors: self.errors.clone(),
            validated: self.validated,
            detached: self.detached,
            _model: PhantomData,
        }
    }
}

impl<M: PersistentModel> fmt::Debug for Persistent<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistent")
            .field("model", &self.schema.model())
            .field("data", &self.data)
            .field("validated", &self.validated)
            .field("detached", &self.detached)
            .finish()
    }
}
