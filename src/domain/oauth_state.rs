//! Single-use CSRF state tokens for the OAuth authorization flow.
//!
//! State machine: `issued → used` (terminal, on any consumption attempt,
//! successful or not) or `issued → expired` (terminal, detected lazily at
//! the moment a consumption is attempted — there is no background sweep).

use serde::{Deserialize, Serialize};

use crate::domain::connection::GcEnvironment;
use crate::domain::foundation::{TenantId, Timestamp};

/// How long an issued state token stays valid.
pub const STATE_TTL_MINUTES: i64 = 10;

/// One authorization attempt's CSRF state row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// Random opaque token; unique key, carried as the `state` parameter.
    pub token: String,

    /// Tenant that initiated the flow.
    pub tenant_id: TenantId,

    /// Environment the tenant is connecting to.
    pub environment: GcEnvironment,

    /// Hard expiry; consumption after this reports "expired".
    pub expires_at: Timestamp,

    /// Set the first time anything consumes the token. Once set, the
    /// token is permanently inert.
    pub used_at: Option<Timestamp>,

    /// When the flow was started.
    pub created_at: Timestamp,
}

impl OAuthState {
    /// Issues a fresh state row with the standard TTL.
    pub fn issue(token: String, tenant_id: TenantId, environment: GcEnvironment) -> Self {
        let now = Timestamp::now();
        Self {
            token,
            tenant_id,
            environment,
            expires_at: now.add_minutes(STATE_TTL_MINUTES),
            used_at: None,
            created_at: now,
        }
    }

    /// Whether the token's validity window has passed at `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.expires_at.is_before(now)
    }

    /// Whether the token has already been consumed.
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued_state() -> OAuthState {
        OAuthState::issue(
            "tok".to_string(),
            TenantId::new("C1").unwrap(),
            GcEnvironment::Sandbox,
        )
    }

    #[test]
    fn fresh_state_is_unused_and_unexpired() {
        let state = issued_state();
        assert!(!state.is_used());
        assert!(!state.is_expired_at(&Timestamp::now()));
    }

    #[test]
    fn expiry_is_ten_minutes_out() {
        let state = issued_state();
        let just_before = state.created_at.add_minutes(STATE_TTL_MINUTES - 1);
        let just_after = state.created_at.add_minutes(STATE_TTL_MINUTES + 1);
        assert!(!state.is_expired_at(&just_before));
        assert!(state.is_expired_at(&just_after));
    }
}
