//! Wire document shapes and engine-facing types.

use crate::error::{SyncError, SyncResult};
use crate::failure_tracker::TrackedFailure;
use crate::mutex::MutexStats;
use crate::resilience::ResilienceStats;
use crate::store::Document;
use budgetsync_crypto::EncodedEnvelope;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Version written into `_metadata` of the main document.
pub const MAIN_DOCUMENT_VERSION: &str = "2.0";

/// The per-session main document.
///
/// Inline fields sit at the top level next to `_manifest` and `_metadata`.
/// Chunked keys keep a `{_chunked, _originalSize}` marker inline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MainDocument {
    #[serde(rename = "_manifest", default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestEnvelope>,
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SyncMetadata>,
    #[serde(flatten)]
    pub inline: Map<String, Value>,
}

impl MainDocument {
    /// Written by reset or clear in place of real data.
    pub fn is_tombstone(&self) -> bool {
        ["_deleted", "_cleared"]
            .iter()
            .any(|k| self.inline.get(*k).and_then(Value::as_bool).unwrap_or(false))
    }

    /// Inline fields with chunked markers removed.
    pub fn plain_fields(&self) -> Map<String, Value> {
        self.inline
            .iter()
            .filter(|(_, v)| !is_chunked_marker(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEnvelope {
    pub encrypted_data: EncodedEnvelope,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub version: String,
    pub last_sync: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub chunked_keys: Vec<String>,
}

/// One stored chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDocument {
    pub encrypted_data: EncodedEnvelope,
    pub budget_id: String,
    pub chunk_id: String,
    pub timestamp: i64,
    pub validation: ChunkValidation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkValidation {
    /// Serialized plaintext size in bytes.
    pub original_size: usize,
    pub checksum: String,
}

/// Inline placeholder for a chunked key.
pub fn chunked_marker(original_len: usize) -> Value {
    json!({ "_chunked": true, "_originalSize": original_len })
}

pub fn is_chunked_marker(value: &Value) -> bool {
    value
        .get("_chunked")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// The caller on whose behalf data is saved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUser {
    pub budget_id: Option<String>,
    pub uid: Option<String>,
    pub id: Option<String>,
}

impl SyncUser {
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    /// First non-empty of `budget_id`, `uid`, `id`.
    pub fn resolve_id(&self) -> Option<&str> {
        [&self.budget_id, &self.uid, &self.id]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearOutcome {
    Cleared,
    /// No session was initialized, so there was nothing to clear.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub max_chunk_size_bytes: usize,
    pub max_items_per_chunk: usize,
    pub chunk_threshold: usize,
    pub is_initialized: bool,
    /// Redacted session id.
    pub session: Option<String>,
    pub resilience: ResilienceStats,
    pub tracked_failures: Vec<TrackedFailure>,
    pub mutex: MutexStats,
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> SyncResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::Validation(format!(
            "expected a JSON object document, got {other}"
        ))),
    }
}

pub(crate) fn from_document<T: DeserializeOwned>(doc: Document) -> SyncResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
