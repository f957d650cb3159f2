use super::error::AjaxError;
use super::request::{AjaxEndpoint, BatchCall, BatchResponse};
use async_trait::async_trait;

/// Sends one physical batch and returns the per-request responses in order.
#[async_trait]
pub trait AjaxTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: AjaxEndpoint,
        calls: Vec<BatchCall>,
    ) -> Result<Vec<BatchResponse>, AjaxError>;
}
