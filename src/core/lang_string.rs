use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a localized message by string identifier and component.
///
/// Resolution to display text happens outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LangString {
    pub identifier: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl LangString {
    pub fn new(identifier: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            component: component.into(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// The generic "invalid data" message.
    pub fn invalid_data() -> Self {
        Self::new("invaliddata", "error")
    }

    pub fn is_empty(&self) -> bool {
        self.identifier.trim().is_empty()
    }
}

impl fmt::Display for LangString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "[[{}, {}]]({})", self.identifier, self.component, param),
            None => write!(f, "[[{}, {}]]", self.identifier, self.component),
        }
    }
}
