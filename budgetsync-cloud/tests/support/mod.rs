//! Shared test helpers: a fault-injecting store, a counting crypto provider,
//! and a pre-initialized engine harness.
#![allow(dead_code)]

use async_trait::async_trait;
use budgetsync_cloud::clock::ManualClock;
use budgetsync_cloud::config::SyncConfig;
use budgetsync_cloud::error::{StoreError, StoreResult};
use budgetsync_cloud::network::ManualNetworkMonitor;
use budgetsync_cloud::store::{Document, DocumentSnapshot, MemoryStore, QueryOp, RemoteStore, WriteBatch};
use budgetsync_cloud::CloudSyncEngine;
use budgetsync_crypto::{AesGcmProvider, CryptoProvider, CryptoResult, EncryptedEnvelope, EncryptionKey};
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const SESSION: &str = "budget-0123456789";

/// 2023-11-14T22:13:20Z
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Routes engine logs to the test writer. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with no debounce and near-instant retries.
pub fn test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.resilience.queue.debounce_ms = 0;
    config.resilience.retry.base_delay_ms = 1;
    config.resilience.retry.max_delay_ms = 5;
    config
}

/// Test config that splits 250 items into five 50-item chunks.
pub fn small_chunk_config() -> SyncConfig {
    let mut config = test_config();
    config.chunking.max_items_per_chunk = 50;
    config.chunking.min_items_per_chunk = 10;
    config
}

pub fn test_key() -> EncryptionKey {
    EncryptionKey::from_bytes([7u8; 32])
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn transactions(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({ "id": format!("tx-{i:04}"), "amount": i as i64 * 100, "memo": "groceries" }))
        .collect()
}

pub fn budget_data(n: usize) -> Map<String, Value> {
    object(json!({
        "transactions": transactions(n),
        "settings": { "currency": "USD", "startOfWeek": 1 },
        "envelopes": [{ "id": "rent", "balance": 120000 }],
    }))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Unavailable,
    Rejected,
}

impl Fault {
    fn error(self) -> StoreError {
        match self {
            Self::Unavailable => StoreError::Unavailable("injected".into()),
            Self::Rejected => StoreError::Rejected("injected".into()),
        }
    }
}

/// Wraps a [`MemoryStore`], counting calls and failing on demand.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub sets: AtomicUsize,
    pub gets: AtomicUsize,
    pub queries: AtomicUsize,
    pub commits: AtomicUsize,
    fault: Mutex<Option<(Fault, usize)>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `times` calls of any kind with `fault`.
    pub fn fail(&self, fault: Fault, times: usize) {
        *self.fault.lock().unwrap() = Some((fault, times));
    }

    pub fn fail_always(&self, fault: Fault) {
        self.fail(fault, usize::MAX);
    }

    pub fn heal(&self) {
        *self.fault.lock().unwrap() = None;
    }

    pub fn total_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.queries.load(Ordering::SeqCst)
            + self.commits.load(Ordering::SeqCst)
    }

    fn injected(&self) -> StoreResult<()> {
        let mut fault = self.fault.lock().unwrap();
        match fault.as_mut() {
            Some((kind, remaining)) if *remaining > 0 => {
                let err = kind.error();
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(err)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for FaultyStore {
    async fn set_document(&self, collection: &str, id: &str, data: Document) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.injected()?;
        self.inner.set_document(collection, id, data).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<DocumentSnapshot> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.injected()?;
        self.inner.get_document(collection, id).await
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<DocumentSnapshot>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.injected()?;
        self.inner.query_where(collection, field, op, value).await
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.injected()?;
        self.inner.commit_batch(batch).await
    }
}

/// AES-GCM provider that counts calls.
#[derive(Default)]
pub struct CountingCrypto {
    inner: AesGcmProvider,
    pub encrypts: AtomicUsize,
    pub decrypts: AtomicUsize,
}

impl CryptoProvider for CountingCrypto {
    fn encrypt(&self, plaintext: &str, key: &EncryptionKey) -> CryptoResult<EncryptedEnvelope> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.encrypt(plaintext, key)
    }

    fn decrypt(&self, envelope: &EncryptedEnvelope, key: &EncryptionKey) -> CryptoResult<String> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt(envelope, key)
    }
}

pub struct Harness {
    pub engine: CloudSyncEngine,
    pub store: Arc<FaultyStore>,
    pub crypto: Arc<CountingCrypto>,
    pub clock: ManualClock,
    pub network: ManualNetworkMonitor,
}

impl Harness {
    /// Engine bound to [`SESSION`] with [`test_key`].
    pub async fn new(config: SyncConfig) -> Self {
        let harness = Self::uninitialized(config);
        harness
            .engine
            .initialize(SESSION, test_key())
            .await
            .expect("initialize must succeed");
        harness
    }

    pub fn uninitialized(config: SyncConfig) -> Self {
        init_tracing();
        let store = Arc::new(FaultyStore::new());
        let crypto = Arc::new(CountingCrypto::default());
        let clock = ManualClock::new(START_MILLIS);
        let network = ManualNetworkMonitor::online();
        let engine = CloudSyncEngine::builder(config, store.clone(), crypto.clone())
            .clock(Arc::new(clock.clone()))
            .network_monitor(Arc::new(network.clone()))
            .build()
            .expect("config must be valid");
        Self {
            engine,
            store,
            crypto,
            clock,
            network,
        }
    }

    pub fn chunk_collection(&self) -> String {
        format!("budgets/{SESSION}/chunks")
    }

    pub fn main_document(&self) -> Option<Document> {
        self.store.inner.document("budgets", SESSION)
    }

    pub fn chunk_document(&self, chunk_id: &str) -> Option<Document> {
        self.store.inner.document(&self.chunk_collection(), chunk_id)
    }

    /// Replaces one field of a stored envelope with raw bytes.
    pub fn overwrite_chunk_iv(&self, chunk_id: &str, iv: &[u8]) {
        let mut doc = self.chunk_document(chunk_id).expect("chunk must exist");
        doc["encryptedData"]["iv"] = json!(budgetsync_crypto::base64_from_bytes(iv));
        self.store.inner.put_raw(&self.chunk_collection(), chunk_id, doc);
    }

    pub fn overwrite_manifest_iv(&self, iv: &[u8]) {
        let mut doc = self.main_document().expect("main document must exist");
        doc["_manifest"]["encryptedData"]["iv"] = json!(budgetsync_crypto::base64_from_bytes(iv));
        self.store.inner.put_raw("budgets", SESSION, doc);
    }
}
