//! Ciphertext + nonce pairs, in memory and on the wire.

use crate::codec::{base64_from_bytes, bytes_from_base64};
use crate::error::CryptoResult;
use serde::{Deserialize, Serialize};

/// One encrypted payload: ciphertext (tag included) and the nonce used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub data: Vec<u8>,
    pub iv: Vec<u8>,
}

impl EncryptedEnvelope {
    pub fn new(data: Vec<u8>, iv: Vec<u8>) -> Self {
        Self { data, iv }
    }

    /// Encodes both fields as base64 for document transport.
    pub fn encode(&self) -> EncodedEnvelope {
        EncodedEnvelope {
            data: Some(base64_from_bytes(&self.data)),
            iv: Some(base64_from_bytes(&self.iv)),
        }
    }
}

/// Wire form of [`EncryptedEnvelope`]. Fields are optional because documents
/// read back from the store may be missing either of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

impl EncodedEnvelope {
    /// Decodes the fields that are present. `Ok(None)` for a missing field.
    pub fn decode_parts(&self) -> CryptoResult<(Option<Vec<u8>>, Option<Vec<u8>>)> {
        let data = self.data.as_deref().map(bytes_from_base64).transpose()?;
        let iv = self.iv.as_deref().map(bytes_from_base64).transpose()?;
        Ok((data, iv))
    }
}
