//! Persistence port for OAuth CSRF state rows.

use async_trait::async_trait;

use crate::domain::foundation::StorageError;
use crate::domain::oauth_state::OAuthState;

/// Port for the OAuthStates record set, keyed by the random state token.
#[async_trait]
pub trait OAuthStateRepository: Send + Sync {
    /// Persist a freshly issued state row.
    async fn insert(&self, state: &OAuthState) -> Result<(), StorageError>;

    /// Atomically consume a state token.
    ///
    /// In a single round trip, sets `used_at` to now *if and only if* the
    /// row exists and is still unused, and returns the updated row. Returns
    /// `None` when the token is unknown or was already consumed — the two
    /// cases are deliberately indistinguishable to the caller, so a replay
    /// learns nothing about whether the token ever existed.
    ///
    /// Expiry is NOT checked here: the caller inspects `expires_at` on the
    /// returned row so an expired token is still burned by this call.
    async fn consume(&self, token: &str) -> Result<Option<OAuthState>, StorageError>;
}
