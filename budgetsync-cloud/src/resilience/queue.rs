//! Debounce queue: within a window, only the last call per key runs.

use crate::error::{SyncError, SyncResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct DebounceQueue {
    window: Duration,
    next_ticket: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl DebounceQueue {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            next_ticket: AtomicU64::new(1),
            latest: Mutex::new(HashMap::new()),
        }
    }

    /// Waits out the debounce window for `key`.
    ///
    /// Returns [`SyncError::Superseded`] if a newer call with the same key
    /// arrived meanwhile. A zero window admits every call immediately.
    pub async fn admit(&self, key: &str) -> SyncResult<()> {
        if self.window.is_zero() {
            return Ok(());
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key.to_string(), ticket);

        tokio::time::sleep(self.window).await;

        let mut latest = self.lock();
        match latest.get(key) {
            Some(&current) if current == ticket => {
                latest.remove(key);
                Ok(())
            }
            _ => {
                debug!("{key} superseded within debounce window");
                Err(SyncError::Superseded {
                    queue_key: key.to_string(),
                })
            }
        }
    }

    /// Keys with a call currently waiting out its window.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
