use crate::core::LangString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property name to message, for every property that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, LangString>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: impl Into<String>, message: LangString) {
        self.errors.insert(property.into(), message);
    }

    pub fn get(&self, property: &str) -> Option<&LangString> {
        self.errors.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.errors.contains_key(property)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LangString)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (property, message) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", property, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of validating an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(ValidationErrors),
}

impl Validation {
    pub fn from_errors(errors: ValidationErrors) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Valid => None,
            Self::Invalid(errors) => Some(errors),
        }
    }
}
