//! Encryption layer for budget sync.
//!
//! The sync engine treats encryption as an injected collaborator. This crate
//! supplies that seam and a production implementation:
//!
//! - [`CryptoProvider`]: `encrypt(text) -> {data, iv}` / `decrypt({data, iv}) -> text`
//! - [`AesGcmProvider`]: AES-256-GCM with a random 96-bit nonce per payload
//! - [`EncryptionKey`]: zeroizing 256-bit key, optionally derived with Argon2id
//! - [`codec`]: windowed base64 for carrying ciphertext inside text documents

pub mod codec;
mod envelope;
mod error;
mod key;
mod provider;

pub use codec::{base64_from_bytes, bytes_from_base64};
pub use envelope::{EncodedEnvelope, EncryptedEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, generate_salt, EncryptionKey, KdfParams, KEY_SIZE, SALT_SIZE};
pub use provider::{AesGcmProvider, CryptoProvider, NONCE_SIZE, TAG_SIZE};
