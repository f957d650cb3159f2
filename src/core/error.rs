use crate::persist::ValidationErrors;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PersistError {
    #[error("Unexpected property '{property}' requested on '{model}'")]
    UnknownProperty { model: String, property: String },

    #[error("id is required to {operation} '{model}'")]
    RequiresId { model: String, operation: String },

    #[error("Record with id {id} not found in table '{table}'")]
    NotFound { table: String, id: i64 },

    #[error("Invalid persistent '{model}': {errors}")]
    InvalidPersistent {
        model: String,
        errors: ValidationErrors,
    },

    #[error("Unexpected error message returned by validator of '{model}.{property}'")]
    InvalidValidatorResult { model: String, property: String },

    #[error("Invalid definition for '{model}.{property}': {reason}")]
    InvalidDefinition {
        model: String,
        property: String,
        reason: String,
    },

    #[error("Cannot {operation} '{model}' with id {id}: the record was deleted")]
    Detached {
        model: String,
        id: i64,
        operation: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl PersistError {
    /// Whether the error is a schema or caller contract violation rather than
    /// a condition the caller is expected to handle.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProperty { .. }
                | Self::RequiresId { .. }
                | Self::InvalidValidatorResult { .. }
                | Self::InvalidDefinition { .. }
                | Self::Detached { .. }
        )
    }

    /// The per-property errors of a failed `create`/`update`.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::InvalidPersistent { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;

impl<T> From<std::sync::PoisonError<T>> for PersistError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
