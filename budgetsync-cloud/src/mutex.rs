//! Serializes sync operations for one engine.
//!
//! Backed by `tokio::sync::Mutex`, which hands the lock to waiters in arrival
//! order and does not poison: a failed operation only fails its own caller.

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Contention counters for [`SyncMutex`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutexStats {
    /// Label of the operation currently holding the lock.
    pub active: Option<String>,
    pub waiting: usize,
    pub completed: u64,
    /// Operations that had to wait for another one.
    pub contended: u64,
}

#[derive(Debug, Default)]
pub struct SyncMutex {
    lock: Mutex<()>,
    active: std::sync::Mutex<Option<String>>,
    waiting: AtomicUsize,
    completed: AtomicU64,
    contended: AtomicU64,
}

impl SyncMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `op` once every earlier caller has settled.
    pub async fn execute<F, Fut, T>(&self, label: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let session = Uuid::new_v4();
        let queued_at = Instant::now();

        let guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                self.waiting.fetch_add(1, Ordering::SeqCst);
                debug!(
                    %session,
                    holder = ?self.active_label(),
                    "{label} waiting for sync lock"
                );
                let guard = self.lock.lock().await;
                self.waiting.fetch_sub(1, Ordering::SeqCst);
                guard
            }
        };

        self.set_active(Some(label.to_string()));
        debug!(
            %session,
            waited_ms = queued_at.elapsed().as_millis() as u64,
            "{label} acquired sync lock"
        );

        let result = op().await;

        self.set_active(None);
        self.completed.fetch_add(1, Ordering::Relaxed);
        drop(guard);
        debug!(%session, "{label} released sync lock");
        result
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    pub fn stats(&self) -> MutexStats {
        MutexStats {
            active: self.active_label(),
            waiting: self.waiting.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
        }
    }

    fn active_label(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_active(&self, label: Option<String>) {
        *self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = label;
    }
}
