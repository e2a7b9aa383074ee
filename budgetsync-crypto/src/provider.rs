//! The `CryptoProvider` seam and its AES-256-GCM implementation.

use crate::envelope::EncryptedEnvelope;
use crate::error::{CryptoError, CryptoResult};
use crate::key::EncryptionKey;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

/// Size of the AES-GCM nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypts and decrypts text payloads for the sync engine.
///
/// Implementations must report malformed input as an error, never panic.
pub trait CryptoProvider: Send + Sync {
    fn encrypt(&self, plaintext: &str, key: &EncryptionKey) -> CryptoResult<EncryptedEnvelope>;

    fn decrypt(&self, envelope: &EncryptedEnvelope, key: &EncryptionKey) -> CryptoResult<String>;
}

/// AES-256-GCM with a fresh random nonce per encryption.
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmProvider;

impl AesGcmProvider {
    pub fn new() -> Self {
        Self
    }

    fn cipher(key: &EncryptionKey) -> CryptoResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("failed to create cipher: {e}")))
    }
}

impl CryptoProvider for AesGcmProvider {
    fn encrypt(&self, plaintext: &str, key: &EncryptionKey) -> CryptoResult<EncryptedEnvelope> {
        let cipher = Self::cipher(key)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let data = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(EncryptedEnvelope::new(data, nonce_bytes.to_vec()))
    }

    fn decrypt(&self, envelope: &EncryptedEnvelope, key: &EncryptionKey) -> CryptoResult<String> {
        if envelope.iv.len() > NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: envelope.iv.len(),
            });
        }
        if envelope.iv.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "the provided data is too small: nonce must be {NONCE_SIZE} bytes, got {}",
                envelope.iv.len()
            )));
        }
        if envelope.data.len() < TAG_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "the provided data is too small: ciphertext must be at least {TAG_SIZE} bytes, got {}",
                envelope.data.len()
            )));
        }

        let cipher = Self::cipher(key)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&envelope.iv), envelope.data.as_ref())
            .map_err(|_| {
                CryptoError::Decryption("invalid key or corrupted data".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Encoding(format!("invalid UTF-8 in decrypted data: {e}")))
    }
}
