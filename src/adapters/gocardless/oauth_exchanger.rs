//! HTTP implementation of the authorization-code exchange.
//!
//! Posts the code to the connect host's token endpoint as a form body and
//! maps the response into an `AccessTokenGrant`. The raw response body is
//! never logged; a failed exchange surfaces only the HTTP status and the
//! provider's error code.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::domain::connection::GcEnvironment;
use crate::ports::{AccessTokenExchanger, AccessTokenGrant, ExchangeError};

/// Exchanges authorization codes against the GoCardless connect hosts.
pub struct GoCardlessTokenExchanger {
    http: reqwest::Client,
    config: OAuthConfig,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    organisation_id: String,
    #[serde(default)]
    scope: Option<String>,
}

/// Error token endpoint response; all fields optional.
#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl GoCardlessTokenExchanger {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AccessTokenExchanger for GoCardlessTokenExchanger {
    async fn exchange(
        &self,
        environment: GcEnvironment,
        code: &str,
    ) -> Result<AccessTokenGrant, ExchangeError> {
        let url = format!("{}/oauth/access_token", environment.connect_base_url());

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            let body: TokenErrorResponse = serde_json::from_str(&text).unwrap_or_default();
            let reason = match (body.error, body.error_description) {
                (Some(e), Some(d)) => format!("{}: {}", e, d),
                (Some(e), None) => e,
                (None, Some(d)) => d,
                (None, None) => "unspecified error".to_string(),
            };
            tracing::warn!(
                environment = environment.as_str(),
                status = status.as_u16(),
                reason = %reason,
                "OAuth code exchange rejected"
            );
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            environment = environment.as_str(),
            organisation_id = %token.organisation_id,
            "OAuth code exchange succeeded"
        );

        Ok(AccessTokenGrant {
            access_token: SecretString::new(token.access_token),
            organisation_id: token.organisation_id,
            scope: token.scope,
        })
    }
}
