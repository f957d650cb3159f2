//! Declarative models persisted one record per instance.

pub mod definition;
pub mod instance;
mod macros;
pub mod schema;
pub mod session;
pub mod validation;

pub use definition::{PropertyDefinition, PropertyType, PropertyValidator, PropertyValues};
pub use instance::Persistent;
pub use schema::{
    ID, ModelSchema, PersistentModel, TIME_CREATED, TIME_MODIFIED, UNIVERSAL_PROPERTIES,
    USER_MODIFIED,
};
pub use session::{Clock, ManualClock, PersistSession, SystemClock};
pub use validation::{Validation, ValidationErrors};
