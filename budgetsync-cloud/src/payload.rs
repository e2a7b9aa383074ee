//! Pre-decryption sanity checks for encrypted payloads.
//!
//! AES-GCM rejects truncated ciphertext or nonces with a low-level error that
//! says little about the cause. Checking sizes first turns that class of
//! failure into a structured report that can be logged and tracked.

use crate::error::{DecryptFailureKind, SyncError, SyncResult};
use budgetsync_crypto::{EncodedEnvelope, EncryptedEnvelope};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Smallest possible ciphertext: the 16-byte GCM tag.
pub const MIN_DATA_SIZE: usize = 16;
pub const MIN_IV_SIZE: usize = 12;
pub const MAX_DATA_SIZE: usize = 1024 * 1024;
/// Payloads above this are accepted with a warning.
pub const LARGE_DATA_SIZE: usize = 100 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub data_size: usize,
    pub iv_size: usize,
    #[serde(skip)]
    kind: Option<DecryptFailureKind>,
    #[serde(skip)]
    decoded: Option<EncryptedEnvelope>,
}

impl PayloadReport {
    /// How a failed payload would have failed in the cipher. `None` if valid.
    pub fn failure_kind(&self) -> Option<DecryptFailureKind> {
        self.kind
    }

    /// The decoded envelope, or a validation error listing every problem.
    pub fn into_envelope(self) -> SyncResult<EncryptedEnvelope> {
        match self.decoded {
            Some(envelope) if self.is_valid => Ok(envelope),
            _ => Err(SyncError::Validation(self.errors.join("; "))),
        }
    }
}

/// Validates a wire envelope read back from a document.
pub fn validate_encrypted_payload(envelope: &EncodedEnvelope, operation: &str) -> PayloadReport {
    let mut errors = Vec::new();

    let data = decode_field("data", envelope.data.as_deref(), &mut errors);
    let iv = decode_field("iv", envelope.iv.as_deref(), &mut errors);
    let malformed = !errors.is_empty();

    let mut report = check_sizes(data.as_deref(), iv.as_deref(), errors);
    if malformed {
        report.kind = Some(DecryptFailureKind::Malformed);
    }
    if report.errors.is_empty() {
        if let (Some(data), Some(iv)) = (data, iv) {
            report.decoded = Some(EncryptedEnvelope::new(data, iv));
        }
    }
    finish(report, operation)
}

/// Validates a freshly produced envelope before it is written.
pub fn validate_envelope(envelope: &EncryptedEnvelope, operation: &str) -> PayloadReport {
    let mut report = check_sizes(Some(&envelope.data), Some(&envelope.iv), Vec::new());
    if report.errors.is_empty() {
        report.decoded = Some(envelope.clone());
    }
    finish(report, operation)
}

fn decode_field(name: &str, value: Option<&str>, errors: &mut Vec<String>) -> Option<Vec<u8>> {
    match value {
        None => {
            errors.push(format!("Missing encrypted {name}"));
            None
        }
        Some("") => Some(Vec::new()),
        Some(text) => match budgetsync_crypto::bytes_from_base64(text) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                errors.push(format!("Encrypted {name} is not valid base64: {e}"));
                None
            }
        },
    }
}

fn check_sizes(data: Option<&[u8]>, iv: Option<&[u8]>, mut errors: Vec<String>) -> PayloadReport {
    let mut warnings = Vec::new();
    let mut kind = None;
    let data_size = data.map_or(0, <[u8]>::len);
    let iv_size = iv.map_or(0, <[u8]>::len);

    if data.is_some() && data_size < MIN_DATA_SIZE {
        errors.push(format!(
            "Encrypted data too small: {data_size} bytes (minimum {MIN_DATA_SIZE})"
        ));
        kind = Some(DecryptFailureKind::Truncated);
    }
    if iv.is_some() && iv_size < MIN_IV_SIZE {
        errors.push(format!(
            "IV too small: {iv_size} bytes (minimum {MIN_IV_SIZE})"
        ));
        kind = Some(DecryptFailureKind::Truncated);
    }
    if data_size > MAX_DATA_SIZE {
        errors.push(format!(
            "Encrypted data too large: {data_size} bytes (maximum {MAX_DATA_SIZE})"
        ));
        kind.get_or_insert(DecryptFailureKind::Malformed);
    } else if data_size > LARGE_DATA_SIZE {
        warnings.push(format!("Large encrypted payload: {data_size} bytes"));
    }
    if !errors.is_empty() {
        kind.get_or_insert(DecryptFailureKind::Malformed);
    }

    PayloadReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        data_size,
        iv_size,
        kind,
        decoded: None,
    }
}

fn finish(report: PayloadReport, operation: &str) -> PayloadReport {
    if !report.is_valid {
        error!(
            errors = ?report.errors,
            data_size = report.data_size,
            iv_size = report.iv_size,
            "encrypted payload rejected for {operation}"
        );
    } else if !report.warnings.is_empty() {
        warn!(warnings = ?report.warnings, "encrypted payload warnings for {operation}");
    } else {
        debug!(
            data_size = report.data_size,
            iv_size = report.iv_size,
            "encrypted payload ok for {operation}"
        );
    }
    report
}
