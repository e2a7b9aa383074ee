//! Chunked encrypted cloud sync for budget data.
//!
//! Synchronizes a local dataset with a document store that limits document
//! and batch sizes:
//! - Large arrays are split into independently stored chunks
//! - An encrypted manifest indexes the chunks and carries checksums
//! - Payloads are size-checked before decryption and checksummed after
//! - One save or load runs at a time per engine
//! - Remote calls go through a debounce queue, circuit breaker and retry
//! - Repeated decrypt failures are tracked and raise a corruption event

pub mod auth;
pub mod checksum;
pub mod chunker;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod failure_tracker;
pub mod http_store;
pub mod manifest;
pub mod mutex;
pub mod network;
pub mod payload;
pub mod resilience;
pub mod store;
pub mod sync_engine;
pub mod types;

pub use config::SyncConfig;
pub use error::{DecryptFailureKind, StoreError, SyncError, SyncResult};
pub use store::{MemoryStore, RemoteStore};
pub use sync_engine::{CloudSyncEngine, CloudSyncEngineBuilder};
pub use types::*;

/// Shortens an identifier for logs and events: first 8 characters + `...`.
pub fn redact(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{prefix}...")
}
