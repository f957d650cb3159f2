use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Exception reported by the remote service for one request, or for the
/// whole batch when the service rejects it outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteException {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errorcode: String,
    /// Remaining fields (`exception`, `link`, `debuginfo`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RemoteException {
    pub fn new(errorcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errorcode: errorcode.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Builds an exception from a service failure body. Such bodies carry the
    /// message under `error` rather than `message`.
    pub fn from_failure(mut body: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut take = |field: &str| match body.remove(field) {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        };
        let message = take("message").or_else(|| take("error")).unwrap_or_default();
        let errorcode = take("errorcode").unwrap_or_default();
        Self {
            message,
            errorcode,
            extra: body,
        }
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errorcode.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, self.errorcode)
        }
    }
}

/// Failure delivered to a result handle. Cloneable because one failure
/// settles several handles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AjaxError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote exception: {0}")]
    Remote(RemoteException),

    #[error("Missing response for request {index}")]
    MissingResponse { index: usize },

    #[error("Request was dropped before a response arrived")]
    Canceled,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl AjaxError {
    pub fn remote(&self) -> Option<&RemoteException> {
        match self {
            Self::Remote(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AjaxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
