use super::error::{AjaxError, RemoteException};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Service script a batch is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AjaxEndpoint {
    /// Requires a logged-in session.
    Session,
    /// Only serves methods that allow anonymous calls.
    NoLogin,
}

impl AjaxEndpoint {
    pub fn for_login(login_required: bool) -> Self {
        if login_required {
            Self::Session
        } else {
            Self::NoLogin
        }
    }

    pub fn script(&self) -> &'static str {
        match self {
            Self::Session => "service.php",
            Self::NoLogin => "service-nologin.php",
        }
    }
}

/// One logical remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AjaxRequest {
    pub methodname: String,
    pub args: serde_json::Value,
    /// Overrides the call-level login requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_required: Option<bool>,
}

impl AjaxRequest {
    pub fn new(methodname: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            methodname: methodname.into(),
            args,
            login_required: None,
        }
    }

    /// Request with arguments taken from any serializable value.
    pub fn serialized<A: Serialize>(methodname: impl Into<String>, args: &A) -> Result<Self, AjaxError> {
        Ok(Self::new(methodname, serde_json::to_value(args)?))
    }

    pub fn login_required(mut self, required: bool) -> Self {
        self.login_required = Some(required);
        self
    }
}

/// Call-level options for `AjaxScheduler::call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Batch with other requests instead of sending immediately.
    pub async_call: bool,
    /// Default login requirement for requests that do not set their own.
    pub login_required: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            async_call: true,
            login_required: true,
        }
    }
}

impl CallOptions {
    /// Send immediately and settle the handles before returning.
    pub fn sync() -> Self {
        Self {
            async_call: false,
            ..Self::default()
        }
    }

    pub fn login_required(mut self, required: bool) -> Self {
        self.login_required = required;
        self
    }
}

/// Wire element of a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCall {
    pub index: usize,
    pub methodname: String,
    pub args: serde_json::Value,
}

/// Wire element of a batch response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub error: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteException>,
}

impl BatchResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            error: false,
            data,
            exception: None,
        }
    }

    pub fn failed(exception: RemoteException) -> Self {
        Self {
            error: true,
            data: serde_json::Value::Null,
            exception: Some(exception),
        }
    }
}

pub type AjaxResult = Result<serde_json::Value, AjaxError>;

/// Settles once the batch carrying its request has been answered.
#[derive(Debug)]
pub struct ResultHandle {
    receiver: oneshot::Receiver<AjaxResult>,
}

impl ResultHandle {
    pub(crate) fn channel() -> (oneshot::Sender<AjaxResult>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// The outcome if already settled.
    pub fn try_result(&mut self) -> Option<AjaxResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(AjaxError::Canceled)),
        }
    }
}

impl Future for ResultHandle {
    type Output = AjaxResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(AjaxError::Canceled)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_defaults() {
        let response: BatchResponse = serde_json::from_value(json!({"error": false})).unwrap();
        assert_eq!(response, BatchResponse::ok(serde_json::Value::Null));
        assert_eq!(AjaxEndpoint::for_login(false), AjaxEndpoint::NoLogin);
    }

    #[tokio::test]
    async fn test_dropped_sender_cancels_handle() {
        let (sender, handle) = ResultHandle::channel();
        drop(sender);
        assert_eq!(handle.await, Err(AjaxError::Canceled));
    }

    #[tokio::test]
    async fn test_try_result() {
        let (sender, mut handle) = ResultHandle::channel();
        assert!(handle.try_result().is_none());
        sender.send(Ok(json!(7))).unwrap();
        assert_eq!(handle.try_result(), Some(Ok(json!(7))));
    }
}
