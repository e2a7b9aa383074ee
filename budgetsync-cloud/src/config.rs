//! Cloud sync configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the chunked sync engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Top-level collection holding one main document per session.
    pub collection: String,

    pub chunking: ChunkingConfig,

    /// Max writes per committed batch (the store's batch limit).
    pub batch_size: usize,

    /// Timeout for writing the main document.
    pub main_document_timeout_ms: u64,

    /// Timeout for committing one chunk batch.
    pub batch_commit_timeout_ms: u64,

    /// Timeout for the authentication handshake in `initialize`.
    pub auth_timeout_ms: u64,

    pub resilience: ResilienceConfig,

    pub integrity: IntegrityConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: "budgets".to_string(),
            chunking: ChunkingConfig::default(),
            batch_size: 500,
            main_document_timeout_ms: 30_000,
            batch_commit_timeout_ms: 45_000,
            auth_timeout_ms: 10_000,
            resilience: ResilienceConfig::default(),
            integrity: IntegrityConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn main_document_timeout(&self) -> Duration {
        Duration::from_millis(self.main_document_timeout_ms)
    }

    pub fn batch_commit_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_commit_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.collection.is_empty() {
            return Err(SyncError::Config("collection must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be > 0".to_string()));
        }
        if self.chunking.max_items_per_chunk == 0 || self.chunking.max_chunk_size_bytes == 0 {
            return Err(SyncError::Config("chunk limits must be > 0".to_string()));
        }
        if self.chunking.min_items_per_chunk > self.chunking.max_items_per_chunk {
            return Err(SyncError::Config(format!(
                "min_items_per_chunk ({}) exceeds max_items_per_chunk ({})",
                self.chunking.min_items_per_chunk, self.chunking.max_items_per_chunk
            )));
        }
        if self.resilience.retry.max_attempts == 0 {
            return Err(SyncError::Config("retry.max_attempts must be > 0".to_string()));
        }
        if self.resilience.circuit.failure_threshold == 0 {
            return Err(SyncError::Config(
                "circuit.failure_threshold must be > 0".to_string(),
            ));
        }
        if self.integrity.max_tracked_failures == 0 {
            return Err(SyncError::Config(
                "integrity.max_tracked_failures must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How large collections are split into chunk documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Serialized-size budget per chunk. Stays under the 1 MiB document limit.
    pub max_chunk_size_bytes: usize,
    pub max_items_per_chunk: usize,
    /// Floor for the size-derived items-per-chunk.
    pub min_items_per_chunk: usize,
    /// Arrays longer than this are chunked; the rest stay inline.
    pub chunk_threshold: usize,
    /// Leading items sampled to estimate the average item size.
    pub sample_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size_bytes: 900 * 1024,
            max_items_per_chunk: 5000,
            min_items_per_chunk: 100,
            chunk_threshold: 100,
            sample_size: 10,
        }
    }
}

/// Retry, circuit breaker and debounce settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub retry: RetryPolicy,
    pub circuit: CircuitConfig,
    pub queue: QueueConfig,
}

/// Exponential backoff for transient failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before `attempt` (1-based retries; attempt 0 is immediate).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = delay_ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit fails fast before letting a trial call through.
    pub cooldown_ms: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 60_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Window in which calls sharing a queue key collapse into the last one.
    pub debounce_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { debounce_ms: 1500 }
    }
}

/// Manifest freshness and decrypt-failure tracking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// A repeated decrypt-failure signature inside this window is skipped.
    pub decrypt_backoff_ms: u64,
    /// Failures newer than this count toward corruption detection.
    pub corruption_window_ms: u64,
    /// Signatures older than this are evicted.
    pub failure_ttl_ms: u64,
    pub max_tracked_failures: usize,
    pub clock_skew_tolerance_ms: i64,
    pub max_manifest_age_hours: i64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            decrypt_backoff_ms: 5 * 60 * 1000,
            corruption_window_ms: 10 * 60 * 1000,
            failure_ttl_ms: 30 * 60 * 1000,
            max_tracked_failures: 64,
            clock_skew_tolerance_ms: 60_000,
            max_manifest_age_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SyncConfig::default().validate().unwrap();
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 350,
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    }

    #[test]
    fn rejects_inverted_chunk_bounds() {
        let mut config = SyncConfig::default();
        config.chunking.min_items_per_chunk = 10_000;
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"batch_size": 20, "chunking": {"chunk_threshold": 5}}"#)
                .unwrap();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.chunking.chunk_threshold, 5);
        assert_eq!(config.chunking.max_items_per_chunk, 5000);
        assert_eq!(config.collection, "budgets");
    }
}
