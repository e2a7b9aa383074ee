//! SHA-256 content digests for integrity checks.
//!
//! Canonicalization: raw bytes and strings are hashed as-is; anything else is
//! hashed over its JSON serialization. Absent optional values serialize as
//! `null` and `chrono` timestamps as ISO-8601, so the digest only depends on
//! the logical value and its field order. Producer and consumer share this
//! path, which is what makes the digest stable across a save/load cycle.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Hex SHA-256 of raw bytes.
pub fn checksum_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex SHA-256 of a value. Returns an empty string if the value cannot be
/// serialized; never panics.
pub fn generate_checksum<T: Serialize + ?Sized>(data: &T) -> String {
    let value = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(e) => {
            warn!("checksum serialization failed: {e}");
            return String::new();
        }
    };

    match value {
        Value::String(s) => checksum_bytes(s.as_bytes()),
        other => match serde_json::to_vec(&other) {
            Ok(bytes) => checksum_bytes(&bytes),
            Err(e) => {
                warn!("checksum serialization failed: {e}");
                String::new()
            }
        },
    }
}

/// Recomputes the digest and compares. `false` if either side is empty.
pub fn validate_checksum<T: Serialize + ?Sized>(data: &T, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let actual = generate_checksum(data);
    !actual.is_empty() && actual == expected
}
