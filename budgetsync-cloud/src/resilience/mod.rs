//! Resilience policies wrapping every remote call.
//!
//! Applied in order: debounce queue, circuit breaker, retry, call. A call
//! superseded in the queue never reaches the breaker; an open breaker never
//! reaches the network; the breaker sees one outcome per retried call.

mod circuit_breaker;
mod queue;
mod retry;

pub use circuit_breaker::{CircuitRegistry, CircuitSnapshot, CircuitState};
pub use queue::DebounceQueue;
pub use retry::with_retry;

use crate::clock::Clock;
use crate::config::{ResilienceConfig, RetryPolicy};
use crate::error::SyncResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResilienceStats {
    pub circuits: BTreeMap<String, CircuitSnapshot>,
    pub pending_queue_keys: usize,
}

pub struct SyncResilience {
    retry: RetryPolicy,
    circuits: CircuitRegistry,
    queue: DebounceQueue,
}

impl SyncResilience {
    pub fn new(config: &ResilienceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            retry: config.retry.clone(),
            circuits: CircuitRegistry::new(config.circuit.clone(), clock),
            queue: DebounceQueue::new(Duration::from_millis(config.queue.debounce_ms)),
        }
    }

    /// Runs `operation` through the queue, the `op_name` circuit, and retry.
    pub async fn execute<F, Fut, T>(&self, op_name: &str, queue_key: &str, operation: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        self.queue.admit(queue_key).await?;
        self.circuits.check(op_name)?;

        match with_retry(&self.retry, op_name, operation).await {
            Ok(value) => {
                self.circuits.record_success(op_name);
                Ok(value)
            }
            Err(e) => {
                if e.counts_against_circuit() {
                    self.circuits.record_failure(op_name);
                }
                Err(e)
            }
        }
    }

    pub fn circuit_state(&self, op_name: &str) -> CircuitState {
        self.circuits.state(op_name)
    }

    pub fn stats(&self) -> ResilienceStats {
        ResilienceStats {
            circuits: self.circuits.snapshot(),
            pending_queue_keys: self.queue.pending(),
        }
    }
}
