//! Per-operation circuit breakers.

use crate::clock::Clock;
use crate::config::CircuitConfig;
use crate::error::{SyncError, SyncResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    /// Failing fast until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the next call is a trial.
    HalfOpen,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<i64>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
        }
    }

    fn allow_request(&mut self, now: i64, cooldown_ms: i64) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match self.opened_at {
                Some(opened) if now - opened < cooldown_ms => false,
                _ => {
                    self.state = CircuitState::HalfOpen;
                    true
                }
            },
        }
    }

    fn record_success(&mut self) -> bool {
        let recovered = self.state != CircuitState::Closed;
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        recovered
    }

    fn record_failure(&mut self, now: i64, threshold: u32) -> bool {
        self.failure_count = self.failure_count.saturating_add(1);
        let should_open = match self.state {
            CircuitState::Closed => self.failure_count >= threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if should_open {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
        }
        should_open
    }
}

/// Circuit breakers keyed by operation name, shared by every caller of that
/// operation.
pub struct CircuitRegistry {
    config: CircuitConfig,
    clock: Arc<dyn Clock>,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl CircuitRegistry {
    pub fn new(config: CircuitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Fails fast with [`SyncError::CircuitOpen`] while the circuit is open.
    pub fn check(&self, op_name: &str) -> SyncResult<()> {
        let now = self.clock.now_millis();
        let cooldown = i64::try_from(self.config.cooldown_ms).unwrap_or(i64::MAX);
        let mut breakers = self.lock();
        let breaker = breakers
            .entry(op_name.to_string())
            .or_insert_with(CircuitBreaker::new);

        let was_open = breaker.state == CircuitState::Open;
        if breaker.allow_request(now, cooldown) {
            if was_open {
                debug!("circuit for {op_name} half-open, allowing trial call");
            }
            Ok(())
        } else {
            Err(SyncError::CircuitOpen {
                operation: op_name.to_string(),
            })
        }
    }

    pub fn record_success(&self, op_name: &str) {
        if let Some(breaker) = self.lock().get_mut(op_name) {
            if breaker.record_success() {
                info!("circuit for {op_name} closed (recovered)");
            }
        }
    }

    pub fn record_failure(&self, op_name: &str) {
        let now = self.clock.now_millis();
        let mut breakers = self.lock();
        let breaker = breakers
            .entry(op_name.to_string())
            .or_insert_with(CircuitBreaker::new);
        if breaker.record_failure(now, self.config.failure_threshold) {
            warn!(
                "circuit for {op_name} opened after {} consecutive failures",
                breaker.failure_count
            );
        }
    }

    pub fn state(&self, op_name: &str) -> CircuitState {
        self.lock()
            .get(op_name)
            .map_or(CircuitState::Closed, |b| b.state)
    }

    pub fn snapshot(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.lock()
            .iter()
            .map(|(name, b)| {
                (
                    name.clone(),
                    CircuitSnapshot {
                        state: b.state,
                        consecutive_failures: b.failure_count,
                    },
                )
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CircuitBreaker>> {
        self.breakers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
