//! Sync manifest: the index needed to reassemble chunked collections.
//!
//! A manifest is built on save, encrypted into the main document, and on
//! load is structurally validated as raw JSON before being deserialized.
//! Structural problems reject it; freshness problems only warn.

use crate::checksum::generate_checksum;
use crate::chunker::Chunk;
use crate::config::IntegrityConfig;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Manifest format written by this engine.
pub const MANIFEST_VERSION: &str = "2.0";

/// Minimum encrypted payload size recorded in the integrity block.
pub const MIN_CHUNK_SIZE: usize = 16;

/// Minimum IV size recorded in the integrity block.
pub const MIN_IV_SIZE: usize = 12;

const REQUIRED_FIELDS: [&str; 3] = ["version", "timestamp", "chunks"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    #[default]
    Array,
    Object,
}

/// Per-chunk entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    /// Serialized plaintext size in bytes.
    pub size: usize,
    #[serde(default)]
    pub item_count: usize,
    #[serde(rename = "type", default)]
    pub kind: ChunkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    #[serde(default)]
    pub total_chunks: usize,
    #[serde(default)]
    pub total_size: usize,
    /// Caller-supplied fields (user id, original keys, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestIntegrity {
    pub manifest_checksum: String,
    pub min_chunk_size: usize,
    #[serde(rename = "minIVSize")]
    pub min_iv_size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
    pub chunks: BTreeMap<String, ChunkInfo>,
    #[serde(default)]
    pub metadata: ManifestMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ManifestIntegrity>,
}

/// The checksummed part of a manifest.
#[derive(Serialize)]
struct ManifestBody<'a> {
    version: &'a str,
    timestamp: i64,
    chunks: &'a BTreeMap<String, ChunkInfo>,
    metadata: &'a ManifestMetadata,
}

impl Manifest {
    /// Builds a manifest for `chunks`, merging caller metadata.
    pub fn build(chunks: &[Chunk], caller_metadata: Map<String, Value>, timestamp: i64) -> Self {
        let mut entries = BTreeMap::new();
        let mut total_size = 0usize;

        for chunk in chunks {
            let size = serde_json::to_vec(&chunk.items)
                .map(|v| v.len())
                .unwrap_or(0);
            entries.insert(
                chunk.id.clone(),
                ChunkInfo {
                    size,
                    item_count: chunk.items.len(),
                    kind: ChunkKind::Array,
                    checksum: Some(generate_checksum(&chunk.items)),
                },
            );
            total_size += size;
        }

        let metadata = ManifestMetadata {
            total_chunks: entries.len(),
            total_size,
            extra: caller_metadata,
        };

        let mut manifest = Self {
            version: MANIFEST_VERSION.to_string(),
            timestamp,
            chunks: entries,
            metadata,
            validation: None,
        };
        manifest.validation = Some(ManifestIntegrity {
            manifest_checksum: manifest.compute_checksum(),
            min_chunk_size: MIN_CHUNK_SIZE,
            min_iv_size: MIN_IV_SIZE,
        });

        debug!(
            total_chunks = manifest.metadata.total_chunks,
            total_size = manifest.metadata.total_size,
            "created manifest"
        );
        manifest
    }

    /// Digest over `{version, timestamp, chunks, metadata}`.
    pub fn compute_checksum(&self) -> String {
        generate_checksum(&ManifestBody {
            version: &self.version,
            timestamp: self.timestamp,
            chunks: &self.chunks,
            metadata: &self.metadata,
        })
    }

    /// `None` when the manifest carries no integrity block.
    pub fn verify_checksum(&self) -> Option<bool> {
        self.validation
            .as_ref()
            .map(|v| !v.manifest_checksum.is_empty() && v.manifest_checksum == self.compute_checksum())
    }

    /// Chunk IDs listed for one collection.
    pub fn chunk_ids_for<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.chunks
            .keys()
            .filter(move |id| crate::chunker::parse_chunk_index(collection, id).is_some())
            .map(String::as_str)
    }
}

/// Outcome of [`validate_manifest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub chunk_count: usize,
    pub manifest_size: usize,
}

/// Validates a manifest's structure and freshness.
pub fn validate_manifest(
    manifest: Option<&Value>,
    operation: &str,
    now_millis: i64,
    limits: &IntegrityConfig,
) -> ManifestReport {
    let mut report = ManifestReport {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        chunk_count: 0,
        manifest_size: 0,
    };

    let obj = match manifest {
        None | Some(Value::Null) => {
            report.errors.push("Manifest is null or undefined".to_string());
            return finish(report, operation);
        }
        Some(Value::Object(obj)) => obj,
        Some(_) => {
            report.errors.push("Manifest must be an object".to_string());
            return finish(report, operation);
        }
    };

    report.manifest_size = manifest
        .and_then(|v| serde_json::to_vec(v).ok())
        .map(|v| v.len())
        .unwrap_or(0);

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            report
                .errors
                .push(format!("Missing required manifest property: {field}"));
        }
    }

    if let Some(version) = obj.get("version") {
        if !version.is_string() {
            report
                .errors
                .push("Manifest version must be a string".to_string());
        }
    }

    if let Some(ts) = obj.get("timestamp") {
        if !ts.is_number() {
            report
                .warnings
                .push("Manifest timestamp must be a number".to_string());
        }
        match parse_timestamp(ts) {
            Some(ts_millis) => check_freshness(ts_millis, now_millis, limits, &mut report),
            None => report
                .warnings
                .push("Manifest timestamp is not parseable".to_string()),
        }
    }

    if let Some(chunks) = obj.get("chunks") {
        match chunks {
            Value::Object(entries) => report.chunk_count = entries.len(),
            _ => report
                .errors
                .push("Manifest chunks must be an object".to_string()),
        }
    }

    finish(report, operation)
}

fn check_freshness(ts: i64, now: i64, limits: &IntegrityConfig, report: &mut ManifestReport) {
    if ts > now.saturating_add(limits.clock_skew_tolerance_ms) {
        report
            .warnings
            .push("Manifest timestamp is in the future".to_string());
    }
    let age_ms = now.saturating_sub(ts);
    let max_age_ms = limits.max_manifest_age_hours.saturating_mul(60 * 60 * 1000);
    if age_ms > max_age_ms {
        report.warnings.push(format!(
            "Manifest is old: {} hours",
            age_ms / (60 * 60 * 1000)
        ));
    }
}

fn finish(mut report: ManifestReport, operation: &str) -> ManifestReport {
    report.is_valid = report.errors.is_empty();
    if !report.is_valid {
        error!(
            errors = ?report.errors,
            "manifest validation failed for {operation}"
        );
    } else if !report.warnings.is_empty() {
        warn!(
            warnings = ?report.warnings,
            "manifest validation warnings for {operation}"
        );
    } else {
        debug!(
            chunk_count = report.chunk_count,
            manifest_size = report.manifest_size,
            "manifest validation passed for {operation}"
        );
    }
    report
}

/// Epoch millis from a number, a numeric string, an RFC 3339 string, or a
/// bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Accepts either a JSON number or a string-encoded timestamp.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct TimestampVisitor;
    impl de::Visitor<'_> for TimestampVisitor {
        type Value = i64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("epoch millis or a timestamp string")
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> { Ok(v) }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(de::Error::custom)
        }
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> { Ok(v as i64) }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            parse_timestamp_str(v)
                .ok_or_else(|| de::Error::custom(format!("unparseable timestamp: {v}")))
        }
    }
    deserializer.deserialize_any(TimestampVisitor)
}
