//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Encryption key is not valid base64")]
    EncryptionKeyNotBase64,

    #[error("Encryption key must decode to exactly 32 bytes, got {0}")]
    EncryptionKeyWrongSize(usize),

    #[error("OAuth redirect URI must use HTTPS in production")]
    RedirectUriMustBeHttps,

    #[error("Rate limit for '{0}' must allow at least one request")]
    ZeroRateLimit(String),

    #[error("Rate limit window for '{0}' must be at least one second")]
    ZeroRateWindow(String),
}
