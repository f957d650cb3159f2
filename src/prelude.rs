//! Recommended imports grouped by concern.
//!
//! `models` covers declaring and persisting models. `remote` covers the
//! batching scheduler.

pub mod models {
    //! Declaring models and running them against a record store.
    pub use crate::persist::{
        ManualClock, PersistSession, Persistent, PersistentModel, PropertyDefinition,
        PropertyType, Validation,
    };
    pub use crate::storage::{Filters, SelectParams, SortOrder};
    pub use crate::{LangString, PersistError, Value, persistent_accessors};
}

pub mod remote {
    //! Batched remote calls and language strings.
    pub use crate::ajax::{
        AjaxConfig, AjaxError, AjaxRequest, AjaxScheduler, CallOptions, HttpTransport,
        StringLoader, StringRequest,
    };
}
