//! Batching client for the site's ajax web service.

pub mod config;
pub mod error;
pub mod http;
pub mod pending;
pub mod request;
pub mod scheduler;
pub mod strings;
pub mod transport;

pub use config::AjaxConfig;
pub use error::{AjaxError, RemoteException};
pub use http::HttpTransport;
pub use pending::PendingTracker;
pub use request::{
    AjaxEndpoint, AjaxRequest, AjaxResult, BatchCall, BatchResponse, CallOptions, ResultHandle,
};
pub use scheduler::AjaxScheduler;
pub use strings::{StringLoader, StringRequest};
pub use transport::AjaxTransport;
