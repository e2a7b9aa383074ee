//! Out-of-band notifications raised by the sync engine.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Raised when repeated decrypt failures look like stored-data corruption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorruptionEvent {
    pub failure_count: u32,
    /// First 8 characters of the session id followed by `...`.
    pub session_id_redacted: String,
    pub timestamp: i64,
}

/// Handle returned by a registration, used to remove the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A set of callbacks for one event type.
pub struct Listeners<E> {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<ListenerId, Callback<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Arc::new(callback));
        id
    }

    /// Returns whether the listener was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Calls every listener in registration order. Callbacks run outside the
    /// lock, so they may register or remove listeners.
    pub fn emit(&self, event: &E) -> usize {
        let callbacks: Vec<Callback<E>> = self.lock().values().cloned().collect();
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ListenerId, Callback<E>>> {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
