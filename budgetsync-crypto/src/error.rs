//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during encryption, decryption, or encoding.
///
/// Every failure of the underlying primitive is mapped into one of these
/// variants; nothing in this crate panics on malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication tag did not verify: wrong key or tampered ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Ciphertext or nonce is shorter than the cipher can accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Nonce is longer than the cipher's fixed nonce size.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The provider could not service the request right now.
    #[error("crypto provider unavailable: {0}")]
    Unavailable(String),
}
