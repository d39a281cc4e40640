//! Port for the authorization-code exchange leg of the OAuth flow.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::connection::GcEnvironment;

/// The provider's answer to a successful code exchange.
pub struct AccessTokenGrant {
    /// Organisation-scoped access token for subsequent API calls.
    pub access_token: SecretString,

    /// GoCardless organisation the token is scoped to.
    pub organisation_id: String,

    /// Granted scope, if the provider reports one.
    pub scope: Option<String>,
}

/// Errors from the code exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The exchange request never completed.
    #[error("token exchange request failed: {0}")]
    Network(String),

    /// The provider rejected the code (expired, reused, wrong client).
    #[error("token exchange rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// The provider answered 2xx but the body was not the expected shape.
    #[error("token exchange response malformed: {0}")]
    InvalidResponse(String),
}

/// Port for exchanging an authorization code for an access token.
///
/// Split from the state manager so tests can drive the consumption logic
/// with a scripted exchanger, including exchanges that fail after the
/// state row was already burned.
#[async_trait]
pub trait AccessTokenExchanger: Send + Sync {
    /// Exchange `code` against the given environment's connect host.
    async fn exchange(
        &self,
        environment: GcEnvironment,
        code: &str,
    ) -> Result<AccessTokenGrant, ExchangeError>;
}
