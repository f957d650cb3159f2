use crate::storage::{MemoryRecordStore, RecordStore};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the unix timestamps written to `timecreated`/`timemodified`.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Store, clock and acting user shared by persistent operations.
#[derive(Clone)]
pub struct PersistSession {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    actor_id: i64,
}

impl PersistSession {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            actor_id: 0,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRecordStore::new()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// User recorded in `usermodified` on writes.
    pub fn with_actor(mut self, actor_id: i64) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn shared_store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }
}

impl fmt::Debug for PersistSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistSession")
            .field("actor_id", &self.actor_id)
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(5);
        assert_eq!(clock.now(), 1_005);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_session_uses_injected_clock_and_actor() {
        let session = PersistSession::in_memory()
            .with_clock(Arc::new(ManualClock::new(77)))
            .with_actor(9);
        assert_eq!(session.now(), 77);
        assert_eq!(session.actor_id(), 9);
    }
}
