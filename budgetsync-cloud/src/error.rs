//! Cloud sync error types.

use budgetsync_crypto::CryptoError;
use std::time::Duration;
use thiserror::Error;

/// Result type for cloud sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for remote store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a payload could not be decrypted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecryptFailureKind {
    /// Authentication failed: wrong key, or the ciphertext was altered.
    KeyMismatchOrCorruption,
    /// Ciphertext or nonce shorter than the cipher can possibly accept.
    Truncated,
    /// Decrypted (or decoded) bytes are not the expected JSON shape.
    Malformed,
    /// The crypto provider failed for reasons unrelated to the payload.
    Transient,
}

impl DecryptFailureKind {
    /// Classifies a crypto provider error.
    pub fn classify(err: &CryptoError) -> Self {
        match err {
            CryptoError::Decryption(_) | CryptoError::InvalidKeyLength { .. } => {
                Self::KeyMismatchOrCorruption
            }
            CryptoError::InvalidInput(_) => Self::Truncated,
            CryptoError::Encoding(_) | CryptoError::InvalidNonceLength { .. } => Self::Malformed,
            CryptoError::Encryption(_)
            | CryptoError::KeyDerivation(_)
            | CryptoError::Unavailable(_) => Self::Transient,
        }
    }

    /// The signature the corruption detector looks for.
    pub fn is_known_corruption(self) -> bool {
        matches!(self, Self::Truncated)
    }

    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyMismatchOrCorruption => "key_mismatch_or_corruption",
            Self::Truncated => "truncated",
            Self::Malformed => "malformed",
            Self::Transient => "transient",
        }
    }
}

impl std::fmt::Display for DecryptFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a [`RemoteStore`](crate::store::RemoteStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document store request timed out")]
    Timeout,

    #[error("document store rejected request: {0}")]
    Rejected(String),

    #[error("document {id} is {size} bytes, limit is {limit}")]
    DocumentTooLarge { id: String, size: usize, limit: usize },

    #[error("batch has {size} writes, limit is {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Network-shaped failures that are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Rejected(_)
            | Self::DocumentTooLarge { .. }
            | Self::BatchTooLarge { .. }
            | Self::Serialization(_) => false,
        }
    }
}

/// Errors that can occur in chunked sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Manifest or payload failed a shape or size check.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("decryption failed ({kind}): {message}")]
    Decrypt {
        kind: DecryptFailureKind,
        message: String,
    },

    #[error("remote store error: {0}")]
    Remote(#[from] StoreError),

    #[error("circuit open for {operation}, failing fast")]
    CircuitOpen { operation: String },

    #[error("superseded by a newer request for {queue_key}")]
    Superseded { queue_key: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("network offline")]
    Offline,

    #[error("chunked sync not initialized")]
    NotInitialized,

    #[error("invalid initialization parameters: {0}")]
    InvalidInit(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether the retry manager should try again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_transient(),
            Self::Timeout { .. } => true,
            Self::Decrypt { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }

    /// Whether the failure says something about the remote operation's health.
    pub fn counts_against_circuit(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
