//! Credential vault: authenticated encryption for stored access tokens.
//!
//! Tokens are encrypted with AES-256-GCM under a single process-wide
//! 32-byte key. Each call uses a fresh random 12-byte nonce; the stored
//! blob is `nonce || ciphertext || tag`, base64-encoded for text storage.
//! Tampering with any byte of the blob makes decryption fail with an
//! explicit error — corrupted plaintext is never returned.
//!
//! # Security
//!
//! - Decrypted plaintext is returned as `secrecy::SecretString`
//! - No plaintext token ever reaches a log line
//! - A missing or mis-sized key is rejected at construction, loudly

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::SecretString;
use thiserror::Error;

use crate::config::{EncryptionConfig, ValidationError, KEY_LEN};

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Errors from vault operations.
///
/// Variants deliberately carry no key or plaintext material.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The system RNG failed to produce a nonce.
    #[error("failed to generate encryption nonce")]
    NonceGeneration,

    /// The key was rejected by the cipher (wrong size).
    #[error("encryption key rejected by cipher")]
    InvalidKey,

    /// Sealing failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The stored blob is not valid base64.
    #[error("stored credential is not valid base64")]
    NotBase64,

    /// The blob is too short to contain a nonce and a tag.
    #[error("stored credential is truncated")]
    Truncated,

    /// Authentication failed: tampered ciphertext or wrong key.
    #[error("credential decryption failed: tampered data or wrong key")]
    DecryptionFailed,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted credential is not valid UTF-8")]
    NotUtf8,
}

/// Encrypts and decrypts stored access tokens.
pub struct CredentialVault {
    key: [u8; KEY_LEN],
    rng: SystemRandom,
}

impl CredentialVault {
    /// Creates a vault from a raw 32-byte key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    /// Creates a vault from validated configuration.
    ///
    /// Fails immediately on a missing or mis-sized key; there is no
    /// fallback key.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, ValidationError> {
        Ok(Self::new(config.key_bytes()?))
    }

    fn sealing_key(&self) -> Result<LessSafeKey, VaultError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key).map_err(|_| VaultError::InvalidKey)?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypts a plaintext token into an opaque storage blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VaultError::NonceGeneration)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let key = self.sealing_key()?;

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend(in_out);

        Ok(STANDARD.encode(blob))
    }

    /// Decrypts a storage blob back into the plaintext token.
    ///
    /// Fails with an explicit error on tampered input or a wrong key;
    /// never returns corrupted plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<SecretString, VaultError> {
        let combined = STANDARD.decode(blob).map_err(|_| VaultError::NotBase64)?;

        if combined.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(VaultError::Truncated);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce_bytes: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| VaultError::Truncated)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let key = self.sealing_key()?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::DecryptionFailed)?;

        let plaintext = String::from_utf8(plaintext.to_vec()).map_err(|_| VaultError::NotUtf8)?;
        Ok(SecretString::new(plaintext))
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key must never appear in debug output.
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use secrecy::ExposeSecret;

    fn test_vault() -> CredentialVault {
        CredentialVault::new([42u8; KEY_LEN])
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let vault = test_vault();
        let blob = vault.encrypt("tok_abc123").unwrap();
        let plaintext = vault.decrypt(&blob).unwrap();
        assert_eq!(plaintext.expose_secret(), "tok_abc123");
    }

    #[test]
    fn blob_is_opaque_text() {
        let vault = test_vault();
        let blob = vault.encrypt("tok_abc123").unwrap();
        assert!(!blob.contains("tok_abc123"));
        assert!(STANDARD.decode(&blob).is_ok());
    }

    #[test]
    fn fresh_nonce_per_call() {
        let vault = test_vault();
        let first = vault.encrypt("tok_abc123").unwrap();
        let second = vault.encrypt("tok_abc123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn corrupting_byte_5_fails_decryption() {
        let vault = test_vault();
        let blob = vault.encrypt("tok_abc123").unwrap();

        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[5] ^= 0x01;
        let tampered = STANDARD.encode(raw);

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn flipping_any_stored_byte_fails_decryption() {
        let vault = test_vault();
        let blob = vault.encrypt("tok_abc123").unwrap();
        let raw = STANDARD.decode(&blob).unwrap();

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let tampered = STANDARD.encode(tampered);
            assert!(
                vault.decrypt(&tampered).is_err(),
                "flipped byte {} should fail decryption",
                i
            );
        }
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let vault = test_vault();
        let other = CredentialVault::new([43u8; KEY_LEN]);
        let blob = vault.encrypt("tok_abc123").unwrap();
        assert!(matches!(
            other.decrypt(&blob),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn garbage_blob_is_rejected() {
        let vault = test_vault();
        assert!(matches!(vault.decrypt("!!!"), Err(VaultError::NotBase64)));
        assert!(matches!(
            vault.decrypt(&STANDARD.encode([0u8; 8])),
            Err(VaultError::Truncated)
        ));
    }

    #[test]
    fn from_config_rejects_bad_key() {
        let config = EncryptionConfig {
            key: STANDARD.encode([1u8; 16]),
        };
        assert!(CredentialVault::from_config(&config).is_err());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let vault = test_vault();
        let rendered = format!("{:?}", vault);
        assert!(!rendered.contains("42"));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_all_plaintexts(plaintext in ".{0,128}") {
            let vault = test_vault();
            let blob = vault.encrypt(&plaintext).unwrap();
            let recovered = vault.decrypt(&blob).unwrap();
            prop_assert_eq!(recovered.expose_secret(), &plaintext);
        }

        #[test]
        fn tampering_never_yields_altered_plaintext(
            plaintext in "[a-zA-Z0-9_]{1,64}",
            position in 0usize..64,
            flip in 1u8..=255,
        ) {
            let vault = test_vault();
            let blob = vault.encrypt(&plaintext).unwrap();
            let mut raw = STANDARD.decode(&blob).unwrap();
            let index = position % raw.len();
            raw[index] ^= flip;
            let tampered = STANDARD.encode(raw);
            prop_assert!(vault.decrypt(&tampered).is_err());
        }
    }
}
