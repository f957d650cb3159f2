// ============================================================================
// persistkit Library
// ============================================================================

pub mod ajax;
pub mod core;
pub mod persist;
pub mod prelude;
pub mod storage;
mod evaluator;
mod expression;
mod parser;
mod plugins;

#[doc(hidden)]
pub use paste;

// Re-export main types for convenience
pub use core::{FromValue, LangString, PersistError, Result, Value};

// Re-export model engine API
pub use persist::{
    Clock, ManualClock, ModelSchema, PersistSession, Persistent, PersistentModel,
    PropertyDefinition, PropertyType, PropertyValues, SystemClock, Validation, ValidationErrors,
};

// Re-export record store API
pub use storage::{Filters, MemoryRecordStore, Record, RecordStore, SelectParams, SortOrder};

// Re-export scheduler API
pub use ajax::{
    AjaxConfig, AjaxEndpoint, AjaxError, AjaxRequest, AjaxScheduler, AjaxTransport, CallOptions,
    HttpTransport, ResultHandle, StringLoader,
};
