use super::config::AjaxConfig;
use super::error::{AjaxError, RemoteException};
use super::pending::PendingTracker;
use super::request::{
    AjaxEndpoint, AjaxRequest, AjaxResult, BatchCall, BatchResponse, CallOptions, ResultHandle,
};
use super::transport::AjaxTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, Level, event, info_span};

struct QueuedRequest {
    methodname: String,
    args: serde_json::Value,
    login_required: bool,
    sender: oneshot::Sender<AjaxResult>,
}

#[derive(Default)]
struct PoolState {
    pool: Vec<QueuedRequest>,
    delay_since_schedule: Duration,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm so a superseded timer that already woke
    /// leaves the pool alone.
    generation: u64,
}

struct SchedulerInner {
    config: AjaxConfig,
    transport: Arc<dyn AjaxTransport>,
    pending: PendingTracker,
    state: Mutex<PoolState>,
}

/// Coalesces logical requests issued in quick succession into one physical
/// batch per service endpoint.
#[derive(Clone)]
pub struct AjaxScheduler {
    inner: Arc<SchedulerInner>,
}

impl AjaxScheduler {
    pub fn new(config: AjaxConfig, transport: Arc<dyn AjaxTransport>) -> Self {
        Self::with_tracker(config, transport, PendingTracker::new())
    }

    pub fn with_tracker(
        config: AjaxConfig,
        transport: Arc<dyn AjaxTransport>,
        pending: PendingTracker,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                transport,
                pending,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    pub fn config(&self) -> &AjaxConfig {
        &self.inner.config
    }

    pub fn pending(&self) -> &PendingTracker {
        &self.inner.pending
    }

    /// Number of requests waiting for the next batch.
    pub async fn queued(&self) -> usize {
        self.inner.state.lock().await.pool.len()
    }

    /// Issues `requests` and returns one handle per request, in order.
    ///
    /// Asynchronous calls join the scheduled pool. Synchronous calls are
    /// sent at once as their own batch and their handles are settled when
    /// this returns.
    pub async fn call(&self, requests: Vec<AjaxRequest>, options: CallOptions) -> Vec<ResultHandle> {
        let mut handles = Vec::with_capacity(requests.len());
        let mut queued = Vec::with_capacity(requests.len());
        for request in requests {
            let (sender, handle) = ResultHandle::channel();
            handles.push(handle);
            queued.push(QueuedRequest {
                login_required: request.login_required.unwrap_or(options.login_required),
                methodname: request.methodname,
                args: request.args,
                sender,
            });
        }

        if options.async_call {
            self.schedule(queued).await;
        } else {
            self.dispatch(queued).await;
        }
        handles
    }

    /// Convenience for a single request.
    pub async fn call_one(&self, request: AjaxRequest, options: CallOptions) -> ResultHandle {
        let mut handles = self.call(vec![request], options).await;
        match handles.pop() {
            Some(handle) => handle,
            None => {
                let (_, handle) = ResultHandle::channel();
                handle
            }
        }
    }

    /// Sends whatever is queued now instead of waiting for the timer.
    pub async fn flush(&self) {
        let batch = {
            let mut state = self.inner.state.lock().await;
            let Some(timer) = state.timer.take() else {
                return;
            };
            timer.abort();
            state.generation += 1;
            state.delay_since_schedule = Duration::ZERO;
            std::mem::take(&mut state.pool)
        };
        self.dispatch(batch).await;
        self.inner.pending.complete(&self.inner.config.pending_key);
    }

    async fn schedule(&self, requests: Vec<QueuedRequest>) {
        let config = &self.inner.config;
        let mut state = self.inner.state.lock().await;
        state.pool.extend(requests);

        if state.delay_since_schedule >= config.max_delay() {
            event!(
                Level::DEBUG,
                queued = state.pool.len(),
                "ajax delay cap reached, keeping current timer"
            );
            return;
        }

        if state.timer.is_none() {
            self.inner.pending.begin(&config.pending_key);
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        state.delay_since_schedule += config.delay;
        state.generation += 1;
        let generation = state.generation;
        // Measured from the enqueue, not from when the timer task first runs.
        let deadline = Instant::now() + config.delay;
        let scheduler = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            scheduler.perform_scheduled(generation).await;
        }));

        event!(
            Level::DEBUG,
            queued = state.pool.len(),
            delay_since_schedule_ms = state.delay_since_schedule.as_millis() as u64,
            "ajax requests scheduled"
        );
    }

    async fn perform_scheduled(&self, generation: u64) {
        let batch = {
            let mut state = self.inner.state.lock().await;
            if state.generation != generation {
                return;
            }
            state.delay_since_schedule = Duration::ZERO;
            state.timer = None;
            std::mem::take(&mut state.pool)
        };

        self.dispatch(batch).await;
        self.inner.pending.complete(&self.inner.config.pending_key);
    }

    async fn dispatch(&self, batch: Vec<QueuedRequest>) {
        if batch.is_empty() {
            return;
        }

        let login_required = batch.iter().any(|request| request.login_required);
        let endpoint = AjaxEndpoint::for_login(login_required);
        let span = info_span!(
            "ajax.dispatch",
            endpoint = endpoint.script(),
            requests = batch.len()
        );

        let mut calls = Vec::with_capacity(batch.len());
        let mut senders = Vec::with_capacity(batch.len());
        for (index, request) in batch.into_iter().enumerate() {
            calls.push(BatchCall {
                index,
                methodname: request.methodname,
                args: request.args,
            });
            senders.push(request.sender);
        }

        let result = self
            .inner
            .transport
            .send(endpoint, calls)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match result {
            Ok(responses) => {
                event!(Level::DEBUG, responses = responses.len(), "ajax batch answered");
                demultiplex(senders, responses);
            }
            Err(err) => {
                event!(Level::WARN, error = %err, "ajax batch failed");
                for sender in senders {
                    let _ = sender.send(Err(err.clone()));
                }
            }
        });
    }
}

/// Resolves handles in order until the first failed or missing response;
/// that handle and every later one are rejected with the same error.
fn demultiplex(senders: Vec<oneshot::Sender<AjaxResult>>, responses: Vec<BatchResponse>) {
    let mut responses = responses.into_iter();
    let mut failure: Option<AjaxError> = None;

    for (index, sender) in senders.into_iter().enumerate() {
        if failure.is_none() {
            match responses.next() {
                Some(response) if !response.error => {
                    let _ = sender.send(Ok(response.data));
                    continue;
                }
                Some(response) => {
                    let exception = response.exception.unwrap_or_else(|| {
                        RemoteException::new("unknownerror", "request failed without an exception")
                    });
                    failure = Some(AjaxError::Remote(exception));
                }
                None => failure = Some(AjaxError::MissingResponse { index }),
            }
        }

        if let Some(err) = &failure {
            let _ = sender.send(Err(err.clone()));
        }
    }
}
