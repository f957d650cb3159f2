use crate::core::{LangString, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref HTML_TAG: Option<Regex> = Regex::new(r"</?[A-Za-z!][^>]*>").ok();
}

fn contains_markup(text: &str) -> bool {
    HTML_TAG.as_ref().is_some_and(|tag| tag.is_match(text))
}

/// Semantic type a property value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// Integers, integral floats, and text spelling a canonical integer.
    Integer,
    /// Any number or numeric text.
    Float,
    /// Booleans, `0`/`1`, `"0"`/`"1"`/`""`.
    Boolean,
    /// Text without markup. Numbers are accepted as their text form.
    Text,
    /// Any non-null scalar.
    Raw,
    /// ASCII letters only.
    Alpha,
    /// ASCII letters and digits.
    AlphaNum,
    /// ASCII letters, digits, `_` and `-`.
    AlphaNumExt,
}

impl PropertyType {
    /// Shape check of a non-null value. NULL is handled by the definition.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (Self::Raw, _) => true,

            (Self::Integer, Value::Integer(_)) => true,
            (Self::Integer, Value::Float(f)) => f.is_finite() && f.fract() == 0.0,
            (Self::Integer, Value::Text(s)) => s
                .parse::<i64>()
                .is_ok_and(|parsed| parsed.to_string() == *s),

            (Self::Float, other) => other.is_numeric() || other.is_numeric_text(),

            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Boolean, Value::Integer(i)) => *i == 0 || *i == 1,
            (Self::Boolean, Value::Text(s)) => matches!(s.as_str(), "0" | "1" | ""),

            (Self::Text, Value::Text(s)) => !contains_markup(s),
            (Self::Text, other) => other.is_numeric(),

            (Self::Alpha, Value::Text(s)) => s.chars().all(|c| c.is_ascii_alphabetic()),
            (Self::AlphaNum, Value::Text(s)) => s.chars().all(|c| c.is_ascii_alphanumeric()),
            (Self::AlphaNumExt, Value::Text(s)) => s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),

            _ => false,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
            Self::Raw => "RAW",
            Self::Alpha => "ALPHA",
            Self::AlphaNum => "ALPHANUM",
            Self::AlphaNumExt => "ALPHANUMEXT",
        };
        write!(f, "{}", name)
    }
}

/// Read access to the current property values while a validator runs.
#[derive(Debug, Clone, Copy)]
pub struct PropertyValues<'a> {
    data: &'a HashMap<String, Value>,
}

impl<'a> PropertyValues<'a> {
    pub(crate) fn new(data: &'a HashMap<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, property: &str) -> Option<&'a Value> {
        self.data.get(property)
    }

    pub fn get_or_null(&self, property: &str) -> Value {
        self.get(property).cloned().unwrap_or_default()
    }
}

/// Custom validator: `Ok(())` or the message to show next to the field.
pub type PropertyValidator =
    Arc<dyn Fn(&Value, &PropertyValues<'_>) -> std::result::Result<(), LangString> + Send + Sync>;

/// Declaration of one model property.
#[derive(Clone)]
pub struct PropertyDefinition {
    name: String,
    property_type: PropertyType,
    default: Option<Value>,
    choices: Option<Vec<Value>>,
    message: Option<LangString>,
    nullable: bool,
    validator: Option<PropertyValidator>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            default: None,
            choices: None,
            message: None,
            nullable: false,
            validator: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Integer)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Boolean)
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<V: Into<Value>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn message(mut self, message: LangString) -> Self {
        self.message = Some(message);
        self
    }

    /// Let NULL pass the type check.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value, &PropertyValues<'_>) -> std::result::Result<(), LangString>
            + Send
            + Sync
            + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Declared default, NULL when none was declared.
    pub fn default(&self) -> Value {
        self.default.clone().unwrap_or_default()
    }

    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    pub fn declared_message(&self) -> Option<&LangString> {
        self.message.as_ref()
    }

    /// Message recorded when the property fails validation.
    pub fn error_message(&self) -> LangString {
        self.message.clone().unwrap_or_else(LangString::invalid_data)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn custom_validator(&self) -> Option<&PropertyValidator> {
        self.validator.as_ref()
    }

    /// Type check including nullability.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.nullable;
        }
        self.property_type.accepts(value)
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("message", &self.message)
            .field("nullable", &self.nullable)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_shape() {
        let t = PropertyType::Integer;
        assert!(t.accepts(&Value::Integer(5)));
        assert!(t.accepts(&Value::Float(5.0)));
        assert!(t.accepts(&Value::Text("-12".into())));
        assert!(!t.accepts(&Value::Text("12abc".into())));
        assert!(!t.accepts(&Value::Text("012".into())));
        assert!(!t.accepts(&Value::Float(1.5)));
        assert!(!t.accepts(&Value::Null));
    }

    #[test]
    fn test_text_rejects_markup() {
        let t = PropertyType::Text;
        assert!(t.accepts(&Value::Text("Plan for 2 < 3".into())));
        assert!(!t.accepts(&Value::Text("<script>alert(1)</script>".into())));
        assert!(t.accepts(&Value::Integer(3)));
        assert!(!t.accepts(&Value::Boolean(true)));
    }

    #[test]
    fn test_alpha_variants_and_boolean() {
        assert!(PropertyType::Alpha.accepts(&Value::Text("abc".into())));
        assert!(!PropertyType::Alpha.accepts(&Value::Text("ab1".into())));
        assert!(PropertyType::AlphaNumExt.accepts(&Value::Text("tool_lp-2".into())));
        assert!(PropertyType::Boolean.accepts(&Value::Integer(1)));
        assert!(!PropertyType::Boolean.accepts(&Value::Integer(2)));
    }

    #[test]
    fn test_nullable_definition() {
        let strict = PropertyDefinition::text("description");
        let relaxed = PropertyDefinition::text("description").nullable();
        assert!(!strict.accepts(&Value::Null));
        assert!(relaxed.accepts(&Value::Null));
        assert_eq!(strict.error_message(), LangString::invalid_data());
        assert!(strict.default().is_null());
    }
}
