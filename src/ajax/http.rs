use super::config::AjaxConfig;
use super::error::{AjaxError, RemoteException};
use super::request::{AjaxEndpoint, BatchCall, BatchResponse};
use super::transport::AjaxTransport;
use async_trait::async_trait;
use serde::Deserialize;

/// Body of a service response: the per-request array, or a single object
/// when the service refused the whole batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceEnvelope {
    Batch(Vec<BatchResponse>),
    Failure(serde_json::Map<String, serde_json::Value>),
}

/// JSON-over-HTTP transport posting to the site's ajax service scripts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: AjaxConfig,
}

impl HttpTransport {
    pub fn new(config: AjaxConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: AjaxConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AjaxConfig {
        &self.config
    }
}

fn decode(body: &[u8]) -> Result<Vec<BatchResponse>, AjaxError> {
    let envelope: ServiceEnvelope = serde_json::from_slice(body)
        .map_err(|err| AjaxError::Transport(format!("invalid service response: {}", err)))?;
    match envelope {
        ServiceEnvelope::Batch(responses) => Ok(responses),
        ServiceEnvelope::Failure(body) => Err(AjaxError::Remote(RemoteException::from_failure(body))),
    }
}

#[async_trait]
impl AjaxTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: AjaxEndpoint,
        calls: Vec<BatchCall>,
    ) -> Result<Vec<BatchResponse>, AjaxError> {
        let url = self.config.service_url(endpoint);
        let response = self
            .client
            .post(&url)
            .json(&calls)
            .send()
            .await
            .map_err(|err| AjaxError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| AjaxError::Transport(err.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|err| AjaxError::Transport(err.to_string()))?;
        decode(&body)
    }
}
