use super::definition::{PropertyDefinition, PropertyType};
use crate::core::{LangString, PersistError, Result, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const ID: &str = "id";
pub const TIME_CREATED: &str = "timecreated";
pub const TIME_MODIFIED: &str = "timemodified";
pub const USER_MODIFIED: &str = "usermodified";

/// Properties every model carries in addition to its own.
pub const UNIVERSAL_PROPERTIES: [&str; 4] = [ID, TIME_CREATED, TIME_MODIFIED, USER_MODIFIED];

lazy_static::lazy_static! {
    static ref SCHEMAS: RwLock<HashMap<TypeId, Arc<ModelSchema>>> = RwLock::new(HashMap::new());
}

/// A model type backed by one table.
pub trait PersistentModel: Send + Sync + 'static {
    const TABLE: &'static str;

    /// The model's own properties, excluding the universal ones.
    fn properties_definition() -> Vec<PropertyDefinition>;

    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Resolved property set of a model: its own properties followed by the
/// universal ones.
#[derive(Debug)]
pub struct ModelSchema {
    model: String,
    table: String,
    properties: Vec<PropertyDefinition>,
    index: HashMap<String, usize>,
}

impl ModelSchema {
    /// Schema of `M`, built on first use and shared afterwards.
    pub fn of<M: PersistentModel>() -> Result<Arc<ModelSchema>> {
        let key = TypeId::of::<M>();
        if let Some(schema) = SCHEMAS.read()?.get(&key) {
            return Ok(schema.clone());
        }

        let built = Arc::new(Self::build(
            M::model_name(),
            M::TABLE,
            M::properties_definition(),
        )?);
        log::debug!(
            "resolved schema for '{}' with {} properties",
            built.model,
            built.properties.len()
        );

        let mut schemas = SCHEMAS.write()?;
        Ok(schemas.entry(key).or_insert(built).clone())
    }

    pub fn build(
        model: &str,
        table: &str,
        definitions: Vec<PropertyDefinition>,
    ) -> Result<ModelSchema> {
        let invalid = |property: &str, reason: String| PersistError::InvalidDefinition {
            model: model.to_string(),
            property: property.to_string(),
            reason,
        };

        let mut properties = Vec::with_capacity(definitions.len() + UNIVERSAL_PROPERTIES.len());
        let mut index = HashMap::new();

        for definition in definitions {
            let name = definition.name().to_string();
            if name.trim().is_empty() {
                return Err(invalid(&name, "property name is empty".into()));
            }
            if UNIVERSAL_PROPERTIES.contains(&name.as_str()) {
                return Err(invalid(&name, "the property is reserved".into()));
            }
            if index.contains_key(&name) {
                return Err(invalid(&name, "the property is declared more than once".into()));
            }
            if definition.declared_message().is_some_and(LangString::is_empty) {
                return Err(invalid(&name, "the error message has no identifier".into()));
            }
            if let Some(choices) = definition.allowed_values() {
                if let Some(bad) = choices.iter().find(|choice| !definition.accepts(choice)) {
                    return Err(invalid(
                        &name,
                        format!(
                            "choice {} is not a valid {}",
                            bad,
                            definition.property_type()
                        ),
                    ));
                }
            }

            index.insert(name, properties.len());
            properties.push(definition);
        }

        for name in UNIVERSAL_PROPERTIES {
            index.insert(name.to_string(), properties.len());
            properties.push(
                PropertyDefinition::new(name, PropertyType::Integer).default_value(0),
            );
        }

        Ok(ModelSchema {
            model: model.to_string(),
            table: table.to_string(),
            properties,
            index,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn properties(&self) -> &[PropertyDefinition] {
        &self.properties
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(PropertyDefinition::name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.index.get(name).map(|&position| &self.properties[position])
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared property or `UnknownProperty`.
    pub fn require(&self, name: &str) -> Result<&PropertyDefinition> {
        self.property(name).ok_or_else(|| PersistError::UnknownProperty {
            model: self.model.clone(),
            property: name.to_string(),
        })
    }

    pub fn default_value(&self, name: &str) -> Result<Value> {
        Ok(self.require(name)?.default())
    }

    pub fn error_message(&self, name: &str) -> Result<LangString> {
        Ok(self.require(name)?.error_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_properties_are_appended() {
        let schema = ModelSchema::build(
            "plan",
            "competency_plan",
            vec![PropertyDefinition::text("name")],
        )
        .unwrap();
        let names: Vec<_> = schema.property_names().collect();
        assert_eq!(
            names,
            vec!["name", "id", "timecreated", "timemodified", "usermodified"]
        );
        assert_eq!(schema.default_value("id").unwrap(), Value::Integer(0));
        assert!(schema.default_value("name").unwrap().is_null());
    }

    #[test]
    fn test_reserved_and_duplicate_names_rejected() {
        let reserved = ModelSchema::build("plan", "plan", vec![PropertyDefinition::integer("id")]);
        assert!(matches!(reserved, Err(PersistError::InvalidDefinition { .. })));

        let duplicate = ModelSchema::build(
            "plan",
            "plan",
            vec![PropertyDefinition::text("name"), PropertyDefinition::text("name")],
        );
        assert!(matches!(duplicate, Err(PersistError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_choice_must_match_type() {
        let result = ModelSchema::build(
            "plan",
            "plan",
            vec![PropertyDefinition::integer("status").choices(["draft", "active"])],
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_unknown_property() {
        let schema = ModelSchema::build("plan", "plan", vec![]).unwrap();
        assert!(matches!(
            schema.error_message("missing"),
            Err(PersistError::UnknownProperty { .. })
        ));
    }
}
