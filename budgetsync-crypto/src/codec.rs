//! Base64 transport codec for byte buffers stored in text documents.
//!
//! Encoding walks the input in bounded windows so very large ciphertexts
//! never build one giant intermediate; each window is a multiple of three
//! bytes, which keeps the concatenated output identical to a one-shot encode.

use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encoding window in bytes (largest multiple of 3 that fits in 32 KiB).
pub const ENCODE_WINDOW: usize = 32 * 1024 / 3 * 3;

/// Encodes bytes as standard padded base64.
pub fn base64_from_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for window in bytes.chunks(ENCODE_WINDOW) {
        STANDARD.encode_string(window, &mut out);
    }
    out
}

/// Decodes standard padded base64. Empty input is an error: an empty field in
/// a stored document means the payload is missing, not that it is zero bytes.
pub fn bytes_from_base64(text: &str) -> CryptoResult<Vec<u8>> {
    if text.is_empty() {
        return Err(CryptoError::Encoding("empty base64 string".to_string()));
    }
    STANDARD.decode(text).map_err(|e| {
        CryptoError::Encoding(format!(
            "failed to decode base64 string (length: {}): {e}",
            text.len()
        ))
    })
}
