//! Chunked sync orchestrator.
//!
//! Save: split large arrays into chunks, build and encrypt the manifest,
//! write the main document, then write chunk documents in batches.
//! Load: read the main document, open the manifest, fetch and decrypt chunks,
//! and reassemble each chunked array in index order.
//!
//! Every save, load, reset and clear runs under the engine's [`SyncMutex`];
//! every remote call goes through [`SyncResilience`]. Load never deletes
//! remote data: decrypt and validation failures resolve to "no data".

use crate::auth::{AlwaysAuthenticated, AuthState, Authenticator, authenticate_with_timeout};
use crate::checksum::{generate_checksum, validate_checksum};
use crate::chunker::{Chunk, ChunkSplitter, reassemble};
use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::{DecryptFailureKind, StoreResult, SyncError, SyncResult};
use crate::events::{CorruptionEvent, ListenerId, Listeners};
use crate::failure_tracker::{FailureSignature, FailureTracker};
use crate::manifest::{Manifest, validate_manifest};
use crate::mutex::SyncMutex;
use crate::network::{ManualNetworkMonitor, NetworkMonitor};
use crate::payload::{validate_encrypted_payload, validate_envelope};
use crate::redact;
use crate::resilience::SyncResilience;
use crate::store::{Document, QueryOp, RemoteStore, WriteBatch};
use crate::types::*;

use budgetsync_crypto::{CryptoProvider, EncodedEnvelope, EncryptionKey};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MANIFEST_PHASE: &str = "manifest";

/// An initialized sync session.
struct Session {
    id: String,
    key: EncryptionKey,
}

/// Builds a [`CloudSyncEngine`] with optional collaborators.
pub struct CloudSyncEngineBuilder {
    config: SyncConfig,
    store: Arc<dyn RemoteStore>,
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
    network: Arc<dyn NetworkMonitor>,
    authenticator: Arc<dyn Authenticator>,
}

impl CloudSyncEngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn network_monitor(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = network;
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn build(self) -> SyncResult<CloudSyncEngine> {
        self.config.validate()?;
        Ok(CloudSyncEngine {
            splitter: ChunkSplitter::new(self.config.chunking.clone()),
            resilience: SyncResilience::new(&self.config.resilience, self.clock.clone()),
            failures: Mutex::new(FailureTracker::new(self.config.integrity.clone())),
            mutex: SyncMutex::new(),
            corruption_listeners: Listeners::new(),
            corruption_notified: AtomicBool::new(false),
            session: RwLock::new(None),
            config: self.config,
            store: self.store,
            crypto: self.crypto,
            clock: self.clock,
            network: self.network,
            authenticator: self.authenticator,
        })
    }
}

/// Chunked encrypted sync engine for one client.
pub struct CloudSyncEngine {
    config: SyncConfig,
    store: Arc<dyn RemoteStore>,
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
    network: Arc<dyn NetworkMonitor>,
    authenticator: Arc<dyn Authenticator>,
    splitter: ChunkSplitter,
    mutex: SyncMutex,
    resilience: SyncResilience,
    failures: Mutex<FailureTracker>,
    corruption_listeners: Listeners<CorruptionEvent>,
    /// Set once the corruption notification has been raised.
    corruption_notified: AtomicBool,
    session: RwLock<Option<Arc<Session>>>,
}

impl CloudSyncEngine {
    /// Starts a builder with the system clock, an always-online network
    /// monitor and no authentication handshake.
    pub fn builder(
        config: SyncConfig,
        store: Arc<dyn RemoteStore>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> CloudSyncEngineBuilder {
        CloudSyncEngineBuilder {
            config,
            store,
            crypto,
            clock: Arc::new(SystemClock),
            network: Arc::new(ManualNetworkMonitor::online()),
            authenticator: Arc::new(AlwaysAuthenticated),
        }
    }

    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RemoteStore>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> SyncResult<Self> {
        Self::builder(config, store, crypto).build()
    }

    // ── Session ──

    /// Binds the engine to a session and its encryption key.
    pub async fn initialize(&self, session_id: &str, key: EncryptionKey) -> SyncResult<()> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(SyncError::InvalidInit(
                "session id must not be empty".to_string(),
            ));
        }

        match authenticate_with_timeout(self.authenticator.as_ref(), self.config.auth_timeout()).await {
            AuthState::Authenticated => {}
            AuthState::NotAuthenticated => {
                warn!("chunked sync not initialized: authentication failed");
                return Err(SyncError::AuthRequired);
            }
        }

        *self.session.write().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(Session {
            id: session_id.to_string(),
            key,
        }));
        // Signatures recorded under a previous key no longer apply.
        self.lock_failures().clear_session(session_id);
        info!("chunked sync initialized for {}", redact(session_id));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    fn session(&self) -> SyncResult<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(SyncError::NotInitialized)
    }

    fn ensure_online(&self) -> SyncResult<()> {
        if self.network.is_online() {
            Ok(())
        } else {
            Err(SyncError::Offline)
        }
    }

    fn chunk_collection(&self, session_id: &str) -> String {
        format!("{}/{session_id}/chunks", self.config.collection)
    }

    // ── Save ──

    /// Writes `data` to the store, chunking arrays above the threshold.
    pub async fn save_to_cloud(&self, data: &Map<String, Value>, user: &SyncUser) -> SyncResult<()> {
        self.ensure_online()?;
        let session = self.session()?;
        self.mutex
            .execute("saveToCloud", || self.save_inner(&session, data, user))
            .await
    }

    async fn save_inner(
        &self,
        session: &Session,
        data: &Map<String, Value>,
        user: &SyncUser,
    ) -> SyncResult<()> {
        let user_id = match user.resolve_id() {
            Some(id) => id.to_string(),
            None => {
                warn!("no user identifier supplied for save, using anonymous");
                "anonymous".to_string()
            }
        };

        let mut inline = Map::new();
        let mut chunked_keys = Vec::new();
        let mut chunks: Vec<Chunk> = Vec::new();
        for (key, value) in data {
            match value {
                Value::Array(items) if self.splitter.should_chunk(items.len()) => {
                    chunks.extend(self.splitter.split(key, items));
                    inline.insert(key.clone(), chunked_marker(items.len()));
                    chunked_keys.push(key.clone());
                }
                other => {
                    inline.insert(key.clone(), other.clone());
                }
            }
        }

        let now = self.clock.now_millis();
        let mut caller_metadata = Map::new();
        caller_metadata.insert("userId".into(), json!(user_id));
        caller_metadata.insert("originalKeys".into(), json!(data.keys().collect::<Vec<_>>()));
        let manifest = Manifest::build(&chunks, caller_metadata, now);

        let manifest_json = serde_json::to_string(&manifest)?;
        let encrypted = self.crypto.encrypt(&manifest_json, &session.key)?;
        let encrypted = validate_envelope(&encrypted, "saveToCloud:manifest").into_envelope()?;

        let main = MainDocument {
            manifest: Some(ManifestEnvelope {
                encrypted_data: encrypted.encode(),
                timestamp: now,
            }),
            metadata: Some(SyncMetadata {
                version: MAIN_DOCUMENT_VERSION.to_string(),
                last_sync: now,
                user_id,
                chunked_keys,
            }),
            inline,
        };
        let main_doc = to_document(&main)?;
        self.write_main_document(session, "saveMainDocument", main_doc)
            .await?;

        let chunk_count = chunks.len();
        self.write_chunks(session, chunks, now).await?;
        self.lock_failures().clear_session(&session.id);

        info!(
            session = %redact(&session.id),
            chunks = chunk_count,
            "saved to cloud"
        );
        Ok(())
    }

    async fn write_main_document(&self, session: &Session, op_name: &str, doc: Document) -> SyncResult<()> {
        let collection = &self.config.collection;
        let id = session.id.as_str();
        let timeout = self.config.main_document_timeout();
        self.resilience
            .execute(op_name, &format!("{op_name}-{id}"), || {
                let doc = doc.clone();
                async move {
                    with_timeout(op_name, timeout, self.store.set_document(collection, id, doc)).await
                }
            })
            .await
            .inspect_err(|e| error!("{op_name} failed: {e}"))
    }

    async fn write_chunks(&self, session: &Session, chunks: Vec<Chunk>, now: i64) -> SyncResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let collection = self.chunk_collection(&session.id);
        let mut documents = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let plaintext = serde_json::to_string(&chunk.items)?;
            let encrypted = self.crypto.encrypt(&plaintext, &session.key)?;
            let doc = ChunkDocument {
                encrypted_data: encrypted.encode(),
                budget_id: session.id.clone(),
                chunk_id: chunk.id.clone(),
                timestamp: now,
                validation: ChunkValidation {
                    original_size: plaintext.len(),
                    checksum: generate_checksum(&chunk.items),
                },
            };
            documents.push((chunk.id, to_document(&doc)?));
        }

        let timeout = self.config.batch_commit_timeout();
        let total = documents.len();
        for (n, slice) in documents.chunks(self.config.batch_size).enumerate() {
            let mut batch = WriteBatch::new();
            for (id, doc) in slice {
                batch.set(collection.as_str(), id.as_str(), doc.clone());
            }
            let size = batch.len();
            self.resilience
                .execute("saveChunkBatch", &format!("saveChunkBatch-{n}"), || {
                    let batch = batch.clone();
                    async move {
                        with_timeout("saveChunkBatch", timeout, self.store.commit_batch(batch)).await
                    }
                })
                .await
                .inspect_err(|e| error!("chunk batch {n} ({size} writes) failed: {e}"))?;
            debug!("committed chunk batch {n} ({size} of {total} chunks)");
        }
        Ok(())
    }

    // ── Load ──

    /// Reads and reassembles the session's data.
    ///
    /// `Ok(None)` when there is nothing usable: no document, a tombstone, or a
    /// manifest that failed validation or decryption. Remote errors that
    /// survive retries are returned.
    pub async fn load_from_cloud(&self) -> SyncResult<Option<Map<String, Value>>> {
        self.ensure_online()?;
        let session = self.session()?;
        self.mutex
            .execute("loadFromCloud", || self.load_inner(&session))
            .await
    }

    async fn load_inner(&self, session: &Session) -> SyncResult<Option<Map<String, Value>>> {
        let now = self.clock.now_millis();
        if self.lock_failures().should_skip(&session.id, now) {
            debug!(
                session = %redact(&session.id),
                "skipping load: manifest failure repeated within backoff window"
            );
            return Ok(None);
        }

        let collection = &self.config.collection;
        let id = session.id.as_str();
        let timeout = self.config.main_document_timeout();
        let snapshot = self
            .resilience
            .execute("loadMainDocument", &format!("loadMainDocument-{id}"), || async move {
                with_timeout("loadMainDocument", timeout, self.store.get_document(collection, id)).await
            })
            .await?;

        let Some(data) = snapshot.data else {
            info!(session = %redact(id), "no cloud data found");
            return Ok(None);
        };

        let main: MainDocument = match from_document(data) {
            Ok(main) => main,
            Err(e) => {
                warn!("main document has unexpected shape: {e}");
                return Ok(None);
            }
        };
        if main.is_tombstone() {
            info!(session = %redact(id), "main document is a tombstone");
            return Ok(None);
        }

        let mut result = main.plain_fields();
        let chunked_keys = main
            .metadata
            .as_ref()
            .map(|m| m.chunked_keys.clone())
            .unwrap_or_default();

        let Some(envelope) = &main.manifest else {
            if !chunked_keys.is_empty() {
                warn!("chunked keys {chunked_keys:?} listed without a manifest");
            }
            return Ok(Some(result));
        };

        let Some(manifest) = self.open_manifest(session, &envelope.encrypted_data, now) else {
            return Ok(None);
        };
        self.lock_failures().clear_session(&session.id);

        if !manifest.chunks.is_empty() {
            let chunks = self.fetch_chunks(session, &manifest).await?;
            for key in &chunked_keys {
                let items = reassemble(
                    key,
                    chunks.iter().map(|(id, items)| (id.as_str(), items.as_slice())),
                );
                let expected = main
                    .inline
                    .get(key)
                    .and_then(|m| m.get("_originalSize"))
                    .and_then(Value::as_u64);
                if let Some(expected) = expected {
                    if expected != items.len() as u64 {
                        warn!(
                            "{key}: reassembled {} of {expected} items, some chunks were skipped",
                            items.len()
                        );
                    }
                }
                result.insert(key.clone(), Value::Array(items));
            }
        }

        info!(
            session = %redact(id),
            keys = result.len(),
            "loaded from cloud"
        );
        Ok(Some(result))
    }

    /// Validates, decrypts and parses the manifest. Failures are tracked and
    /// logged, and yield `None`.
    fn open_manifest(&self, session: &Session, encoded: &EncodedEnvelope, now: i64) -> Option<Manifest> {
        let report = validate_encrypted_payload(encoded, "loadFromCloud:manifest");
        if !report.is_valid {
            let kind = report
                .failure_kind()
                .unwrap_or(DecryptFailureKind::Malformed);
            self.note_manifest_failure(session, kind, &report.errors.join("; "), now);
            return None;
        }
        let envelope = match report.into_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                self.note_manifest_failure(session, DecryptFailureKind::Malformed, &e.to_string(), now);
                return None;
            }
        };

        let plaintext = match self.crypto.decrypt(&envelope, &session.key) {
            Ok(text) => text,
            Err(e) => {
                self.note_manifest_failure(session, DecryptFailureKind::classify(&e), &e.to_string(), now);
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&plaintext) {
            Ok(value) => value,
            Err(e) => {
                self.note_manifest_failure(session, DecryptFailureKind::Malformed, &e.to_string(), now);
                return None;
            }
        };

        let report = validate_manifest(Some(&value), "loadFromCloud", now, &self.config.integrity);
        if !report.is_valid {
            self.note_manifest_failure(
                session,
                DecryptFailureKind::Malformed,
                &report.errors.join("; "),
                now,
            );
            return None;
        }

        let manifest: Manifest = match serde_json::from_value(value) {
            Ok(manifest) => manifest,
            Err(e) => {
                self.note_manifest_failure(session, DecryptFailureKind::Malformed, &e.to_string(), now);
                return None;
            }
        };

        if manifest.verify_checksum() == Some(false) {
            self.note_manifest_failure(
                session,
                DecryptFailureKind::KeyMismatchOrCorruption,
                "manifest checksum mismatch",
                now,
            );
            return None;
        }

        Some(manifest)
    }

    fn note_manifest_failure(&self, session: &Session, kind: DecryptFailureKind, message: &str, now: i64) {
        let (recorded, corruption_count) = {
            let mut failures = self.lock_failures();
            let recorded = failures.record(FailureSignature::new(&session.id, MANIFEST_PHASE, kind), now);
            (recorded, failures.recent_corruption_count(&session.id, now))
        };

        if recorded.recurring {
            debug!(%kind, count = recorded.count, "manifest failure recurred within backoff window");
        } else {
            warn!(
                session = %redact(&session.id),
                %kind,
                "failed to open manifest: {message}"
            );
        }

        if kind.is_known_corruption() && corruption_count >= 2 {
            self.notify_corruption(session, corruption_count, now);
        }
    }

    fn notify_corruption(&self, session: &Session, failure_count: u32, now: i64) {
        if self.corruption_notified.swap(true, Ordering::SeqCst) {
            return;
        }
        let event = CorruptionEvent {
            failure_count,
            session_id_redacted: redact(&session.id),
            timestamp: now,
        };
        error!(
            failure_count,
            session = %event.session_id_redacted,
            "sync data corruption detected"
        );
        self.corruption_listeners.emit(&event);
    }

    /// Fetches, decrypts and verifies every chunk listed in the manifest.
    /// Unreadable chunks are skipped.
    async fn fetch_chunks(&self, session: &Session, manifest: &Manifest) -> SyncResult<HashMap<String, Vec<Value>>> {
        let collection = self.chunk_collection(&session.id);
        let owner = json!(session.id);
        let docs = self
            .resilience
            .execute("loadChunks", &format!("loadChunks-{}", session.id), || {
                let collection = collection.as_str();
                let owner = &owner;
                async move {
                    self.store
                        .query_where(collection, "budgetId", QueryOp::Equal, owner)
                        .await
                        .map_err(SyncError::from)
                }
            })
            .await?;

        let mut chunks = HashMap::new();
        for snapshot in docs {
            let Some(info) = manifest.chunks.get(&snapshot.id) else {
                debug!("ignoring chunk {} not listed in manifest", snapshot.id);
                continue;
            };
            let Some(data) = snapshot.data else {
                continue;
            };
            let doc: ChunkDocument = match from_document(data) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("skipping chunk {}: unexpected shape: {e}", snapshot.id);
                    continue;
                }
            };
            let expected = info
                .checksum
                .as_deref()
                .filter(|c| !c.is_empty())
                .unwrap_or(&doc.validation.checksum);
            if let Some(items) = self.open_chunk(session, &snapshot.id, &doc, expected) {
                chunks.insert(snapshot.id, items);
            }
        }

        let missing = manifest.chunks.len() - chunks.len();
        if missing > 0 {
            warn!("{missing} of {} chunks could not be loaded", manifest.chunks.len());
        }
        Ok(chunks)
    }

    fn open_chunk(&self, session: &Session, id: &str, doc: &ChunkDocument, expected_checksum: &str) -> Option<Vec<Value>> {
        let envelope = match validate_encrypted_payload(&doc.encrypted_data, &format!("loadChunk:{id}")).into_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("skipping chunk {id}: {e}");
                return None;
            }
        };

        let plaintext = match self.crypto.decrypt(&envelope, &session.key) {
            Ok(text) => text,
            Err(e) => {
                let kind = DecryptFailureKind::classify(&e);
                warn!(%kind, "skipping chunk {id}: {e}");
                return None;
            }
        };

        let items: Vec<Value> = match serde_json::from_str(&plaintext) {
            Ok(items) => items,
            Err(e) => {
                warn!("skipping chunk {id}: not a JSON array: {e}");
                return None;
            }
        };

        if !expected_checksum.is_empty() && !validate_checksum(&items, expected_checksum) {
            warn!("skipping chunk {id}: checksum mismatch");
            return None;
        }
        Some(items)
    }

    // ── Reset / clear ──

    /// Tombstones the main document and deletes every chunk.
    pub async fn reset_cloud_data(&self) -> SyncResult<()> {
        self.ensure_online()?;
        let session = self.session()?;
        self.mutex
            .execute("resetCloudData", || async {
                let tombstone = json!({ "_deleted": true, "_timestamp": self.clock.now_millis() });
                self.write_main_document(&session, "resetCloudData", object(tombstone))
                    .await?;
                let deleted = self.delete_chunks(&session).await?;
                self.lock_failures().clear_session(&session.id);
                info!(session = %redact(&session.id), deleted, "cloud data reset");
                Ok::<(), SyncError>(())
            })
            .await
    }

    /// Deletes every chunk, then replaces the main document with a
    /// cleared marker.
    pub async fn clear_corrupted_data(&self) -> SyncResult<()> {
        self.ensure_online()?;
        let session = self.session()?;
        self.mutex
            .execute("clearCorruptedData", || async {
                let deleted = self.delete_chunks(&session).await?;
                let marker = json!({
                    "_cleared": true,
                    "_timestamp": self.clock.now_millis(),
                    "_reason": "Corrupted data cleared",
                });
                self.write_main_document(&session, "clearCorruptedData", object(marker))
                    .await?;
                self.lock_failures().clear_session(&session.id);
                info!(session = %redact(&session.id), deleted, "corrupted cloud data cleared");
                Ok::<(), SyncError>(())
            })
            .await
    }

    /// Like [`clear_corrupted_data`](Self::clear_corrupted_data), but
    /// succeeds with [`ClearOutcome::Skipped`] when no session is set.
    pub async fn clear_all_data(&self) -> SyncResult<ClearOutcome> {
        if !self.is_initialized() {
            info!("no session initialized, skipping clear");
            return Ok(ClearOutcome::Skipped);
        }
        self.clear_corrupted_data().await?;
        Ok(ClearOutcome::Cleared)
    }

    async fn delete_chunks(&self, session: &Session) -> SyncResult<usize> {
        let collection = self.chunk_collection(&session.id);
        let owner = json!(session.id);
        let docs = self
            .resilience
            .execute("queryChunks", &format!("queryChunks-{}", session.id), || {
                let collection = collection.as_str();
                let owner = &owner;
                async move {
                    self.store
                        .query_where(collection, "budgetId", QueryOp::Equal, owner)
                        .await
                        .map_err(SyncError::from)
                }
            })
            .await?;

        let timeout = self.config.batch_commit_timeout();
        let ids: Vec<String> = docs.into_iter().map(|d| d.id).collect();
        for (n, slice) in ids.chunks(self.config.batch_size).enumerate() {
            let mut batch = WriteBatch::new();
            for id in slice {
                batch.delete(collection.as_str(), id.as_str());
            }
            self.resilience
                .execute("deleteChunkBatch", &format!("deleteChunkBatch-{n}"), || {
                    let batch = batch.clone();
                    async move {
                        with_timeout("deleteChunkBatch", timeout, self.store.commit_batch(batch)).await
                    }
                })
                .await?;
        }
        Ok(ids.len())
    }

    // ── Events / stats ──

    /// Registers a handler for the corruption notification.
    pub fn on_corruption_detected<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&CorruptionEvent) + Send + Sync + 'static,
    {
        self.corruption_listeners.add(handler)
    }

    pub fn remove_corruption_listener(&self, id: ListenerId) -> bool {
        self.corruption_listeners.remove(id)
    }

    /// Allows the corruption notification to be raised again.
    pub fn reset_corruption_notice(&self) {
        self.corruption_notified.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> SyncStats {
        let session = self
            .session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|s| redact(&s.id));
        SyncStats {
            max_chunk_size_bytes: self.config.chunking.max_chunk_size_bytes,
            max_items_per_chunk: self.config.chunking.max_items_per_chunk,
            chunk_threshold: self.config.chunking.chunk_threshold,
            is_initialized: session.is_some(),
            session,
            resilience: self.resilience.stats(),
            tracked_failures: self.lock_failures().snapshot(),
            mutex: self.mutex.stats(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, FailureTracker> {
        self.failures.lock().unwrap_or_else(|p| p.into_inner())
    }
}

async fn with_timeout<T>(
    operation: &str,
    after: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> SyncResult<T> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(SyncError::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}
