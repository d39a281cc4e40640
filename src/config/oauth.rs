//! OAuth (GoCardless connect) configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::RuntimeEnvironment;

/// OAuth client configuration for the GoCardless partner app.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfig {
    /// Partner app client id.
    pub client_id: String,

    /// Partner app client secret.
    pub client_secret: String,

    /// Redirect URI registered with GoCardless; the callback endpoint of
    /// the host application.
    pub redirect_uri: String,
}

impl OAuthConfig {
    /// Validate the OAuth configuration.
    ///
    /// In production the redirect URI must be HTTPS; in development
    /// localhost over HTTP is allowed.
    pub fn validate(&self, environment: &RuntimeEnvironment) -> Result<(), ValidationError> {
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("OAUTH_CLIENT_ID"));
        }
        if self.client_secret.is_empty() {
            return Err(ValidationError::MissingRequired("OAUTH_CLIENT_SECRET"));
        }
        if self.redirect_uri.is_empty() {
            return Err(ValidationError::MissingRequired("OAUTH_REDIRECT_URI"));
        }

        if *environment == RuntimeEnvironment::Production
            && !self.redirect_uri.starts_with("https://")
        {
            return Err(ValidationError::RedirectUriMustBeHttps);
        }

        Ok(())
    }
}
