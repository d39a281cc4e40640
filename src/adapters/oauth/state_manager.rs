//! Orchestrates the two legs of the connect flow.
//!
//! `start` issues a single-use state token and builds the authorize URL;
//! `complete` atomically burns the token, exchanges the code, encrypts the
//! granted access token and upserts the tenant's connection. The state row
//! is burned before anything else happens in `complete`, so a replayed
//! callback can never trigger a second exchange even when the first one
//! failed.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::ExposeSecret;

use crate::adapters::vault::CredentialVault;
use crate::config::OAuthConfig;
use crate::domain::connection::{Connection, GcEnvironment};
use crate::domain::foundation::{StorageError, TenantId, Timestamp};
use crate::domain::oauth_state::OAuthState;
use crate::ports::{
    AccessTokenExchanger, ConnectionRepository, ExchangeError, OAuthStateRepository,
};

/// Raw entropy per state token before encoding.
const STATE_TOKEN_LEN: usize = 32;

/// Errors from the connect flow.
#[derive(Debug, thiserror::Error)]
pub enum OAuthFlowError {
    /// The state token is unknown or was already consumed. The two cases
    /// are deliberately indistinguishable to the caller.
    #[error("state token is invalid or already used")]
    StateInvalid,

    /// The state token was valid once but its window has passed.
    #[error("state token has expired")]
    StateExpired,

    /// The random generator failed to produce a token.
    #[error("failed to generate state token")]
    TokenGeneration,

    /// The authorize URL could not be constructed from the configuration.
    #[error("failed to build authorize URL: {0}")]
    AuthorizeUrl(String),

    /// The code exchange failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// A repository operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The granted access token could not be sealed for storage.
    #[error("failed to encrypt access token: {0}")]
    Encryption(String),
}

/// A started flow: where to send the operator, and the token to expect back.
#[derive(Debug, Clone)]
pub struct StartedFlow {
    /// Full GoCardless authorize URL including the state parameter.
    pub authorize_url: String,

    /// The issued state token, for callers that track flows themselves.
    pub state_token: String,
}

/// Drives the OAuth connect flow end to end.
pub struct OAuthStateManager {
    states: Arc<dyn OAuthStateRepository>,
    connections: Arc<dyn ConnectionRepository>,
    vault: Arc<CredentialVault>,
    exchanger: Arc<dyn AccessTokenExchanger>,
    config: OAuthConfig,
    rng: SystemRandom,
}

impl OAuthStateManager {
    pub fn new(
        states: Arc<dyn OAuthStateRepository>,
        connections: Arc<dyn ConnectionRepository>,
        vault: Arc<CredentialVault>,
        exchanger: Arc<dyn AccessTokenExchanger>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            states,
            connections,
            vault,
            exchanger,
            config,
            rng: SystemRandom::new(),
        }
    }

    /// Starts a connect flow for a tenant.
    ///
    /// Issues a fresh state token, persists it, and returns the authorize
    /// URL for the chosen environment. Starting again before an earlier
    /// flow finishes simply issues another token; old ones expire on their
    /// own schedule.
    pub async fn start(
        &self,
        tenant_id: TenantId,
        environment: GcEnvironment,
    ) -> Result<StartedFlow, OAuthFlowError> {
        let state_token = self.generate_state_token()?;
        let state = OAuthState::issue(state_token.clone(), tenant_id.clone(), environment);
        self.states.insert(&state).await?;

        let base = format!("{}/oauth/authorize", environment.connect_base_url());
        let url = reqwest::Url::parse_with_params(
            &base,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", "read_write"),
                ("state", state_token.as_str()),
            ],
        )
        .map_err(|e| OAuthFlowError::AuthorizeUrl(e.to_string()))?;

        tracing::info!(
            tenant_id = %tenant_id,
            environment = environment.as_str(),
            "OAuth connect flow started"
        );

        Ok(StartedFlow {
            authorize_url: url.into(),
            state_token,
        })
    }

    /// Completes a connect flow from the provider callback.
    ///
    /// The state row is consumed first, unconditionally: whatever happens
    /// after, that token is spent. Expiry is checked on the consumed row,
    /// so an expired token is burned by the attempt that discovers it.
    pub async fn complete(
        &self,
        state_token: &str,
        code: &str,
    ) -> Result<Connection, OAuthFlowError> {
        let state = self
            .states
            .consume(state_token)
            .await?
            .ok_or(OAuthFlowError::StateInvalid)?;

        if state.is_expired_at(&Timestamp::now()) {
            tracing::warn!(
                tenant_id = %state.tenant_id,
                "OAuth callback arrived after state expiry"
            );
            return Err(OAuthFlowError::StateExpired);
        }

        let grant = self.exchanger.exchange(state.environment, code).await?;

        let encrypted = self
            .vault
            .encrypt(grant.access_token.expose_secret())
            .map_err(|e| OAuthFlowError::Encryption(e.to_string()))?;

        let connection = Connection::established(
            state.tenant_id.clone(),
            state.environment,
            encrypted,
            grant.organisation_id,
        );
        self.connections.upsert(&connection).await?;

        tracing::info!(
            tenant_id = %state.tenant_id,
            environment = state.environment.as_str(),
            organisation_id = %connection.organisation_id,
            "OAuth connect flow completed"
        );

        Ok(connection)
    }

    fn generate_state_token(&self) -> Result<String, OAuthFlowError> {
        let mut bytes = [0u8; STATE_TOKEN_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| OAuthFlowError::TokenGeneration)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::adapters::memory::{InMemoryConnectionRepository, InMemoryOAuthStateRepository};
    use crate::ports::AccessTokenGrant;

    /// Scripted exchanger that counts its invocations.
    struct ScriptedExchanger {
        succeed: bool,
        calls: AtomicUsize,
    }

    impl ScriptedExchanger {
        fn succeeding() -> Self {
            Self {
                succeed: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                succeed: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccessTokenExchanger for ScriptedExchanger {
        async fn exchange(
            &self,
            _environment: GcEnvironment,
            _code: &str,
        ) -> Result<AccessTokenGrant, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(AccessTokenGrant {
                    access_token: SecretString::new("live_token_abc".to_string()),
                    organisation_id: "OR777".to_string(),
                    scope: Some("read_write".to_string()),
                })
            } else {
                Err(ExchangeError::Rejected {
                    status: 400,
                    reason: "invalid_grant".to_string(),
                })
            }
        }
    }

    struct Harness {
        manager: OAuthStateManager,
        states: Arc<InMemoryOAuthStateRepository>,
        connections: Arc<InMemoryConnectionRepository>,
        exchanger: Arc<ScriptedExchanger>,
        vault: Arc<CredentialVault>,
    }

    fn harness(exchanger: ScriptedExchanger) -> Harness {
        let states = Arc::new(InMemoryOAuthStateRepository::new());
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let vault = Arc::new(CredentialVault::new([3u8; 32]));
        let exchanger = Arc::new(exchanger);
        let config = OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "https://app.example.com/gc/callback".to_string(),
        };
        let manager = OAuthStateManager::new(
            states.clone(),
            connections.clone(),
            vault.clone(),
            exchanger.clone(),
            config,
        );
        Harness {
            manager,
            states,
            connections,
            exchanger,
            vault,
        }
    }

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    #[tokio::test]
    async fn start_builds_authorize_url_with_state() {
        let h = harness(ScriptedExchanger::succeeding());
        let flow = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();

        assert!(flow
            .authorize_url
            .starts_with("https://connect-sandbox.gocardless.com/oauth/authorize?"));
        assert!(flow.authorize_url.contains("response_type=code"));
        assert!(flow.authorize_url.contains("scope=read_write"));
        assert!(flow
            .authorize_url
            .contains(&format!("state={}", flow.state_token)));
    }

    #[tokio::test]
    async fn state_tokens_are_unique_per_flow() {
        let h = harness(ScriptedExchanger::succeeding());
        let a = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();
        let b = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();
        assert_ne!(a.state_token, b.state_token);
    }

    #[tokio::test]
    async fn complete_round_trip_stores_encrypted_connection() {
        let h = harness(ScriptedExchanger::succeeding());
        let flow = h
            .manager
            .start(tenant("acme"), GcEnvironment::Live)
            .await
            .unwrap();

        let connection = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap();

        assert_eq!(connection.organisation_id, "OR777");
        assert!(connection.is_active());
        // The stored blob is ciphertext, and it opens back to the grant.
        assert_ne!(connection.encrypted_access_token, "live_token_abc");
        let decrypted = h.vault.decrypt(&connection.encrypted_access_token).unwrap();
        assert_eq!(decrypted.expose_secret(), "live_token_abc");

        let stored = h
            .connections
            .find_active(&tenant("acme"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.organisation_id, "OR777");
    }

    #[tokio::test]
    async fn unknown_state_is_rejected_without_exchange() {
        let h = harness(ScriptedExchanger::succeeding());
        let err = h
            .manager
            .complete("forged-token", "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::StateInvalid));
        assert_eq!(h.exchanger.call_count(), 0);
    }

    #[tokio::test]
    async fn replayed_callback_is_rejected_after_success() {
        let h = harness(ScriptedExchanger::succeeding());
        let flow = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();

        h.manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap();
        let err = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::StateInvalid));
        assert_eq!(h.exchanger.call_count(), 1);
    }

    #[tokio::test]
    async fn expired_token_reports_expired_once_then_invalid() {
        let h = harness(ScriptedExchanger::succeeding());
        let flow = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();

        // Age the row past its window, as if the callback arrived late.
        {
            let mut state = h.states.peek(&flow.state_token).await.unwrap();
            state.expires_at = state.created_at.add_minutes(-1);
            h.states.insert(&state).await.unwrap();
        }

        let err = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::StateExpired));
        assert_eq!(h.exchanger.call_count(), 0);

        // The expiry check happened on a burned row, so a retry sees
        // invalid/used rather than a fresh expiry verdict.
        let err = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::StateInvalid));
    }

    #[tokio::test]
    async fn failed_exchange_still_burns_the_state_token() {
        let h = harness(ScriptedExchanger::failing());
        let flow = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();

        let err = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::Exchange(_)));

        // A second attempt finds the token already spent.
        let err = h
            .manager
            .complete(&flow.state_token, "auth_code_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthFlowError::StateInvalid));
        assert_eq!(h.exchanger.call_count(), 1);

        // And no connection materialized.
        assert!(h
            .connections
            .find_active(&tenant("acme"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reconnect_replaces_the_stored_connection() {
        let h = harness(ScriptedExchanger::succeeding());

        let first = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();
        let original = h
            .manager
            .complete(&first.state_token, "code_a")
            .await
            .unwrap();

        let second = h
            .manager
            .start(tenant("acme"), GcEnvironment::Sandbox)
            .await
            .unwrap();
        let replacement = h
            .manager
            .complete(&second.state_token, "code_b")
            .await
            .unwrap();

        // Fresh nonce per seal, so the ciphertext rotates even for the
        // same underlying token.
        assert_ne!(
            original.encrypted_access_token,
            replacement.encrypted_access_token
        );

        let stored = h
            .connections
            .find_active(&tenant("acme"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.encrypted_access_token,
            replacement.encrypted_access_token
        );
    }
}
