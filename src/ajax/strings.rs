use super::error::AjaxError;
use super::request::{AjaxRequest, CallOptions};
use super::scheduler::AjaxScheduler;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const GET_STRING_METHOD: &str = "core_get_string";
pub const DEFAULT_LANG: &str = "en";

type SharedLookup = Shared<BoxFuture<'static, Result<String, AjaxError>>>;

/// One language string to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRequest {
    pub key: String,
    pub component: String,
    /// Substituted for `{$a}`.
    pub param: Option<String>,
    /// Falls back to the loader's language.
    pub lang: Option<String>,
}

impl StringRequest {
    pub fn new(key: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            component: component.into(),
            param: None,
            lang: None,
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

fn cache_key(key: &str, component: &str, lang: &str) -> String {
    format!("core_str/{}/{}/{}", key, component, lang)
}

fn substitute(text: &str, param: Option<&str>) -> String {
    match param {
        Some(param) => text.replace("{$a}", param),
        None => text.to_string(),
    }
}

/// Language string lookups through the batching scheduler. Each string is
/// fetched at most once per language; concurrent lookups share one call.
#[derive(Clone)]
pub struct StringLoader {
    scheduler: AjaxScheduler,
    lang: String,
    cache: Arc<Mutex<HashMap<String, SharedLookup>>>,
}

impl StringLoader {
    pub fn new(scheduler: AjaxScheduler) -> Self {
        Self {
            scheduler,
            lang: DEFAULT_LANG.to_string(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Seeds the cache with strings that are already known.
    pub async fn preload<I, K, C, T>(&self, strings: I)
    where
        I: IntoIterator<Item = (K, C, T)>,
        K: AsRef<str>,
        C: AsRef<str>,
        T: Into<String>,
    {
        let mut cache = self.cache.lock().await;
        for (key, component, text) in strings {
            let text = text.into();
            let lookup: SharedLookup = futures::future::ready(Ok(text)).boxed().shared();
            cache.insert(cache_key(key.as_ref(), component.as_ref(), &self.lang), lookup);
        }
    }

    pub async fn is_cached(&self, key: &str, component: &str) -> bool {
        let cache = self.cache.lock().await;
        cache.contains_key(&cache_key(key, component, &self.lang))
    }

    pub async fn get_string(
        &self,
        key: &str,
        component: &str,
        param: Option<&str>,
        lang: Option<&str>,
    ) -> Result<String, AjaxError> {
        let mut request = StringRequest::new(key, component);
        request.param = param.map(str::to_string);
        request.lang = lang.map(str::to_string);

        let mut strings = self.get_strings(vec![request]).await?;
        strings
            .pop()
            .ok_or(AjaxError::MissingResponse { index: 0 })
    }

    /// Resolves every request, issuing one scheduled call per string that is
    /// neither cached nor already in flight.
    pub async fn get_strings(&self, requests: Vec<StringRequest>) -> Result<Vec<String>, AjaxError> {
        let ids: Vec<String> = requests
            .iter()
            .map(|request| {
                let lang = request.lang.as_deref().unwrap_or(&self.lang);
                cache_key(&request.key, &request.component, lang)
            })
            .collect();

        let lookups = {
            let mut cache = self.cache.lock().await;

            let mut missing_ids = Vec::new();
            let mut missing_calls = Vec::new();
            for (id, request) in ids.iter().zip(&requests) {
                if cache.contains_key(id) || missing_ids.contains(id) {
                    continue;
                }
                let lang = request.lang.as_deref().unwrap_or(&self.lang);
                missing_ids.push(id.clone());
                missing_calls.push(AjaxRequest::new(
                    GET_STRING_METHOD,
                    json!({
                        "stringid": request.key,
                        "component": request.component,
                        "lang": lang,
                        "stringparams": [],
                    }),
                ));
            }

            if !missing_calls.is_empty() {
                let handles = self
                    .scheduler
                    .call(missing_calls, CallOptions::default().login_required(false))
                    .await;
                for (id, handle) in missing_ids.into_iter().zip(handles) {
                    let lookup: SharedLookup = async move {
                        let value = handle.await?;
                        value.as_str().map(str::to_string).ok_or_else(|| {
                            AjaxError::Encoding(format!("expected a string, got {}", value))
                        })
                    }
                    .boxed()
                    .shared();
                    cache.insert(id, lookup);
                }
            }

            let mut lookups = Vec::with_capacity(ids.len());
            for (index, id) in ids.iter().enumerate() {
                let lookup = cache
                    .get(id)
                    .cloned()
                    .ok_or(AjaxError::MissingResponse { index })?;
                lookups.push(lookup);
            }
            lookups
        };

        let results = join_all(lookups.iter().cloned()).await;

        let mut strings = Vec::with_capacity(results.len());
        let mut failure = None;
        for (((id, lookup), request), result) in ids.iter().zip(&lookups).zip(&requests).zip(results) {
            match result {
                Ok(text) => strings.push(substitute(&text, request.param.as_deref())),
                Err(err) => {
                    self.evict(id, lookup).await;
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(strings),
        }
    }

    async fn evict(&self, id: &str, failed: &SharedLookup) {
        let mut cache = self.cache.lock().await;
        if cache.get(id).is_some_and(|current| current.ptr_eq(failed)) {
            cache.remove(id);
        }
    }
}
