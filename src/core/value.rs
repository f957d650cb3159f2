use crate::core::{PersistError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A scalar property value as stored in a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Total order used for sorting: NULL first, numbers by value, then text,
    /// booleans last when types differ.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,

            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),

            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                }
            }

            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Integer(_) | Self::Float(_) => 1,
            Self::Text(_) => 2,
            Self::Boolean(_) => 3,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty() && s != "0",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Text that reads as a number, e.g. `"42"` or `"1.5"`.
    pub fn is_numeric_text(&self) -> bool {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
            }
            _ => false,
        }
    }

    /// Loose equality used to decide whether a stored value actually changed.
    ///
    /// Numeric text equals the number it spells, booleans compare by
    /// truthiness against other scalars, NULL equals only NULL.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Boolean(a), b) | (b, Self::Boolean(a)) => *a == b.as_bool(),
            (Self::Text(a), Self::Text(b)) => {
                if self.is_numeric_text() && other.is_numeric_text() {
                    self.as_f64() == other.as_f64()
                } else {
                    a == b
                }
            }
            (a, b) if a.is_numeric() && b.is_numeric() => a == b,
            (number, text) | (text, number) if number.is_numeric() => {
                text.is_numeric_text() && number.as_f64() == text.as_f64()
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// Typed extraction of a property value.
pub trait FromValue: Sized {
    fn from_value(property: &str, value: Value) -> Result<Self>;
}

fn mismatch(property: &str, expected: &str, value: &Value) -> PersistError {
    PersistError::TypeMismatch(format!(
        "property '{}' expects {}, got {}",
        property,
        expected,
        value.type_name()
    ))
}

impl FromValue for i64 {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match &value {
            Value::Integer(i) => Ok(*i),
            Value::Boolean(b) => Ok(i64::from(*b)),
            Value::Text(_) if value.is_numeric_text() => {
                value.as_i64().ok_or_else(|| mismatch(property, "INTEGER", &value))
            }
            Value::Float(f) if f.fract() == 0.0 => {
                value.as_i64().ok_or_else(|| mismatch(property, "INTEGER", &value))
            }
            _ => Err(mismatch(property, "INTEGER", &value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| mismatch(property, "FLOAT", &value))
    }
}

impl FromValue for bool {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(mismatch(property, "BOOLEAN", &value)),
            other => Ok(other.as_bool()),
        }
    }
}

impl FromValue for String {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Err(mismatch(property, "TEXT", &value)),
            other => Ok(other.to_string()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(property, other).map(Some),
        }
    }
}
