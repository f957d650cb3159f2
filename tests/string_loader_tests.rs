use async_trait::async_trait;
use persistkit::ajax::{
    AjaxConfig, AjaxEndpoint, AjaxError, AjaxScheduler, AjaxTransport, BatchCall, BatchResponse,
    RemoteException, StringLoader, StringRequest,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves `core_get_string` from a fixed table, failing the first
/// `failures` batches.
struct LangServer {
    batches: Mutex<Vec<(AjaxEndpoint, Vec<BatchCall>)>>,
    failures: AtomicUsize,
}

impl LangServer {
    fn new() -> Arc<Self> {
        Self::failing(0)
    }

    fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(failures),
        })
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(|(_, calls)| calls.len()).collect()
    }

    fn lookup(call: &BatchCall) -> BatchResponse {
        let key = call.args["stringid"].as_str().unwrap_or_default();
        let component = call.args["component"].as_str().unwrap_or_default();
        let lang = call.args["lang"].as_str().unwrap_or_default();
        let text = match (key, component, lang) {
            ("edit", "core", "en") => "Edit",
            ("edit", "core", "fr") => "Modifier",
            ("delete", "core", "en") => "Delete",
            ("deleteplan", "tool_lp", "en") => "Delete plan {$a}",
            _ => {
                return BatchResponse::failed(RemoteException::new(
                    "invalidparameter",
                    format!("unknown string {}/{}", component, key),
                ));
            }
        };
        BatchResponse::ok(json!(text))
    }
}

#[async_trait]
impl AjaxTransport for LangServer {
    async fn send(
        &self,
        endpoint: AjaxEndpoint,
        calls: Vec<BatchCall>,
    ) -> Result<Vec<BatchResponse>, AjaxError> {
        self.batches.lock().unwrap().push((endpoint, calls.clone()));
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AjaxError::Transport("503 Service Unavailable".to_string()));
        }
        Ok(calls.iter().map(Self::lookup).collect())
    }
}

fn loader(server: Arc<LangServer>) -> StringLoader {
    let scheduler = AjaxScheduler::new(AjaxConfig::new("https://lms.example.org", "sk"), server);
    StringLoader::new(scheduler)
}

#[tokio::test(start_paused = true)]
async fn test_missing_strings_share_one_batch() {
    let server = LangServer::new();
    let loader = loader(server.clone());

    let strings = loader
        .get_strings(vec![
            StringRequest::new("edit", "core"),
            StringRequest::new("delete", "core"),
            StringRequest::new("edit", "core"),
        ])
        .await
        .unwrap();

    assert_eq!(strings, vec!["Edit", "Delete", "Edit"]);
    assert_eq!(server.batch_sizes(), vec![2]);

    let batches = server.batches.lock().unwrap();
    let (endpoint, calls) = &batches[0];
    assert_eq!(*endpoint, AjaxEndpoint::NoLogin);
    assert_eq!(calls[0].methodname, "core_get_string");
    assert_eq!(
        calls[0].args,
        json!({"stringid": "edit", "component": "core", "lang": "en", "stringparams": []})
    );
}

#[tokio::test(start_paused = true)]
async fn test_cached_strings_are_not_requested_again() {
    let server = LangServer::new();
    let loader = loader(server.clone());

    assert_eq!(loader.get_string("edit", "core", None, None).await.unwrap(), "Edit");
    assert!(loader.is_cached("edit", "core").await);
    assert_eq!(loader.get_string("edit", "core", None, None).await.unwrap(), "Edit");
    assert_eq!(server.batch_sizes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_preloaded_strings_skip_the_server() {
    let server = LangServer::new();
    let loader = loader(server.clone());
    loader.preload([("save", "core", "Save changes")]).await;

    let text = loader.get_string("save", "core", None, None).await.unwrap();
    assert_eq!(text, "Save changes");
    assert!(server.batch_sizes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_param_substitution_uses_cached_template() {
    let server = LangServer::new();
    let loader = loader(server.clone());

    let first = loader
        .get_string("deleteplan", "tool_lp", Some("Year 1"), None)
        .await
        .unwrap();
    let second = loader
        .get_string("deleteplan", "tool_lp", Some("Year 2"), None)
        .await
        .unwrap();

    assert_eq!(first, "Delete plan Year 1");
    assert_eq!(second, "Delete plan Year 2");
    assert_eq!(server.batch_sizes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_language_is_part_of_the_cache_key() {
    let server = LangServer::new();
    let loader = loader(server.clone()).with_lang("fr");

    assert_eq!(loader.get_string("edit", "core", None, None).await.unwrap(), "Modifier");
    assert_eq!(loader.get_string("edit", "core", None, Some("en")).await.unwrap(), "Edit");
    assert_eq!(server.batch_sizes(), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_call() {
    let server = LangServer::new();
    let loader = loader(server.clone());

    let (a, b) = tokio::join!(
        loader.get_string("edit", "core", None, None),
        loader.get_string("edit", "core", None, None),
    );

    assert_eq!(a.unwrap(), "Edit");
    assert_eq!(b.unwrap(), "Edit");
    assert_eq!(server.batch_sizes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_lookup_is_evicted_and_retried() {
    let server = LangServer::failing(1);
    let loader = loader(server.clone());

    let err = loader.get_string("edit", "core", None, None).await.unwrap_err();
    assert_eq!(err, AjaxError::Transport("503 Service Unavailable".to_string()));
    assert!(!loader.is_cached("edit", "core").await);

    assert_eq!(loader.get_string("edit", "core", None, None).await.unwrap(), "Edit");
    assert_eq!(server.batch_sizes(), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_string_reports_remote_error() {
    let server = LangServer::new();
    let loader = loader(server.clone());

    let err = loader
        .get_strings(vec![
            StringRequest::new("edit", "core"),
            StringRequest::new("nosuchstring", "core"),
        ])
        .await
        .unwrap_err();

    let exception = err.remote().unwrap();
    assert_eq!(exception.errorcode, "invalidparameter");
    assert!(loader.is_cached("edit", "core").await);
    assert!(!loader.is_cached("nosuchstring", "core").await);
}
