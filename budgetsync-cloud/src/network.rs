//! Connectivity state, injected so the engine never reads ambient globals.

use crate::events::{ListenerId, Listeners};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

pub trait NetworkMonitor: Send + Sync {
    fn is_online(&self) -> bool;

    /// Registers a callback invoked with the new state on every change.
    fn subscribe(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId) -> bool;
}

/// A monitor whose state is set explicitly. Clones share state.
#[derive(Clone)]
pub struct ManualNetworkMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    online: AtomicBool,
    listeners: Listeners<bool>,
}

impl ManualNetworkMonitor {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                online: AtomicBool::new(online),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    /// Updates the state, notifying subscribers only on a change.
    pub fn set_online(&self, online: bool) {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!(online, "network state changed");
            self.inner.listeners.emit(&online);
        }
    }
}

impl Default for ManualNetworkMonitor {
    fn default() -> Self {
        Self::online()
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> ListenerId {
        self.inner.listeners.add(move |online: &bool| callback(*online))
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}
