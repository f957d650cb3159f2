use crate::core::{PersistError, Result, Value};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A flat row: field name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a field. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(position).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    /// The `id` field as an integer, if present and integral.
    pub fn id(&self) -> Option<i64> {
        self.get("id").and_then(Value::as_i64)
    }

    /// Keeps only the listed fields, in the listed order.
    pub fn project(&self, fields: &Fields) -> Record {
        match fields {
            Fields::All => self.clone(),
            Fields::Only(names) => names
                .iter()
                .filter_map(|name| self.get(name).map(|value| (name.clone(), value.clone())))
                .collect(),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a flat object of scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    record.insert(name, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Equality conditions joined by AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    conditions: Vec<(String, Value)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    /// Whether every condition holds for `record`. Missing fields never match.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            record
                .get(field)
                .is_some_and(|actual| !actual.is_null() && actual.loose_eq(expected))
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Filters::new(), |filters, (field, value)| filters.eq(field, value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" | "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(PersistError::Parse(format!("Invalid sort order '{}'", other))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `field [ASC|DESC]` term of a sort clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Parsed `"name ASC, id DESC"` sort clause. Empty means store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut keys = Vec::new();
        for term in raw.split(',').map(str::trim).filter(|term| !term.is_empty()) {
            let mut parts = term.split_whitespace();
            let field = parts
                .next()
                .ok_or_else(|| PersistError::Parse(format!("Invalid sort term '{}'", term)))?;
            if !is_identifier(field) {
                return Err(PersistError::Parse(format!("Invalid sort field '{}'", field)));
            }
            let order = SortOrder::parse(parts.next().unwrap_or_default())?;
            if parts.next().is_some() {
                return Err(PersistError::Parse(format!("Invalid sort term '{}'", term)));
            }
            keys.push(SortKey {
                field: field.to_string(),
                order,
            });
        }
        Ok(Self { keys })
    }

    /// Sort by a single field, as the model's `get_records` takes it.
    pub fn field(field: &str, order: SortOrder) -> Result<Self> {
        if field.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::parse(&format!("{} {}", field.trim(), order.as_sql()))
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Field projection: `*` or a comma separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    #[default]
    All,
    Only(Vec<String>),
}

impl Fields {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::All);
        }
        let names = trimmed
            .split(',')
            .map(str::trim)
            .map(|name| {
                if is_identifier(name) {
                    Ok(name.to_string())
                } else {
                    Err(PersistError::Parse(format!("Invalid field name '{}'", name)))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Only(names))
    }
}

/// Bound parameters for a raw select clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectParams {
    #[default]
    None,
    /// Bound to `?` placeholders in textual order.
    Positional(Vec<Value>),
    /// Bound to `:name` placeholders.
    Named(BTreeMap<String, Value>),
}

impl SelectParams {
    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<K: Into<String>, V: Into<Value>>(values: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Named(
            values
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_insertion_order() {
        let mut record = Record::new().with("b", 1).with("a", 2);
        record.insert("b", 3);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(&Value::Integer(3)));
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn sort_spec_parsing() {
        let spec = SortSpec::parse("name ASC, id desc").unwrap();
        assert_eq!(spec.keys().len(), 2);
        assert_eq!(spec.keys()[1].order, SortOrder::Desc);
        assert!(SortSpec::parse("name; DROP").is_err());
        assert!(SortSpec::parse("").unwrap().is_empty());
    }

    #[test]
    fn fields_parsing() {
        assert_eq!(Fields::parse("*").unwrap(), Fields::All);
        assert_eq!(
            Fields::parse("id, name").unwrap(),
            Fields::Only(vec!["id".into(), "name".into()])
        );
        assert!(Fields::parse("id, 1x").is_err());
    }

    #[test]
    fn filters_match_loosely() {
        let record = Record::new().with("userid", "5").with("name", "Alice");
        assert!(Filters::new().eq("userid", 5).matches(&record));
        assert!(!Filters::new().eq("missing", 0).matches(&record));
    }
}
