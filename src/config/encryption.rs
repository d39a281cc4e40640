//! Credential encryption configuration

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use super::error::ValidationError;

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Configuration for the credential vault's encryption key.
///
/// The key is a single 32-byte secret, base64-encoded in the environment.
/// A missing or mis-sized key fails validation immediately; there is no
/// fallback key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte key.
    pub key: String,
}

impl EncryptionConfig {
    /// Decodes and size-checks the key.
    pub fn key_bytes(&self) -> Result<[u8; KEY_LEN], ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::MissingRequired("ENCRYPTION_KEY"));
        }

        let decoded = STANDARD
            .decode(self.key.as_bytes())
            .map_err(|_| ValidationError::EncryptionKeyNotBase64)?;

        let len = decoded.len();
        decoded
            .try_into()
            .map_err(|_| ValidationError::EncryptionKeyWrongSize(len))
    }

    /// Validate the encryption configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.key_bytes().map(|_| ())
    }
}
