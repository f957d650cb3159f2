use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

#[derive(Debug)]
struct PendingInner {
    counts: Mutex<HashMap<String, usize>>,
    idle: watch::Sender<bool>,
}

/// Counts outstanding work per key so tests and tools can wait until the
/// scheduler has gone quiet.
#[derive(Debug, Clone)]
pub struct PendingTracker {
    inner: Arc<PendingInner>,
}

impl Default for PendingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTracker {
    pub fn new() -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(PendingInner {
                counts: Mutex::new(HashMap::new()),
                idle,
            }),
        }
    }

    pub fn begin(&self, key: &str) {
        let mut counts = self.inner.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(key.to_string()).or_insert(0) += 1;
        self.inner.idle.send_replace(false);
    }

    /// Completing a key that is not pending is a no-op.
    pub fn complete(&self, key: &str) {
        let mut counts = self.inner.counts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = counts.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                counts.remove(key);
            }
        }
        self.inner.idle.send_replace(counts.is_empty());
    }

    pub fn count(&self, key: &str) -> usize {
        let counts = self.inner.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.get(key).copied().unwrap_or(0)
    }

    pub fn is_pending(&self) -> bool {
        !*self.inner.idle.borrow()
    }

    pub fn pending_keys(&self) -> Vec<String> {
        let counts = self.inner.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = counts.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolves once no key is pending.
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = idle.wait_for(|idle| *idle).await;
    }
}
