//! Connector configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are loaded with the `GC_CONNECT`
//! prefix and nested sections use double underscores as separators.
//!
//! Validation is eager: a missing or malformed encryption key, OAuth
//! secret, or limit table entry is a fatal configuration error surfaced at
//! first use, never silently defaulted.
//!
//! # Example
//!
//! ```no_run
//! use gocardless_connect::config::ConnectorConfig;
//!
//! let config = ConnectorConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod encryption;
mod error;
mod oauth;
mod rate_limit;

pub use encryption::{EncryptionConfig, KEY_LEN};
pub use error::{ConfigError, ValidationError};
pub use oauth::OAuthConfig;
pub use rate_limit::{
    EndpointLimit, EndpointLimitEntry, FailurePolicy, RateLimitConfig,
};

use serde::Deserialize;

/// Runtime environment of the host application.
///
/// Controls production-only tightening: HTTPS redirect URIs and the
/// suppression of full webhook payload logging.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    /// Whether payload logging and HTTP redirects must be locked down.
    pub fn is_production_like(&self) -> bool {
        matches!(self, RuntimeEnvironment::Staging | RuntimeEnvironment::Production)
    }
}

/// Root connector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Runtime environment (development/staging/production).
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Credential vault key.
    pub encryption: EncryptionConfig,

    /// GoCardless partner app OAuth settings.
    pub oauth: OAuthConfig,

    /// Per-endpoint rate limit table.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Webhook endpoint signing secret shared with GoCardless.
    #[serde(default)]
    pub webhook_secret: String,
}

impl ConnectorConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` if present (development), then reads variables with
    /// the `GC_CONNECT` prefix and `__` section separators, e.g.
    /// `GC_CONNECT__ENCRYPTION__KEY` or `GC_CONNECT__OAUTH__CLIENT_ID`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("GC_CONNECT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.encryption.validate()?;
        self.oauth.validate(&self.environment)?;
        self.rate_limits.validate()?;
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("WEBHOOK_SECRET"));
        }
        Ok(())
    }
}
