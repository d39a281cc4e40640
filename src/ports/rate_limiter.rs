//! Rate limiting port.
//!
//! Defines the interface for quota enforcement using a fixed-window
//! counter. Implementations must make the increment and the limit check a
//! single atomic operation against their counter store; a check-then-act
//! sequence would let concurrent requests race past the limit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EndpointLimit;
use crate::domain::foundation::{TenantId, Timestamp};

/// Port for rate limiting operations.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Atomically increment the counter for `key` and check it against
    /// `limit`, in one round trip to the counter store.
    ///
    /// Returns `Allowed` with remaining quota or `Denied` with retry info.
    async fn check_and_consume(
        &self,
        key: &RateLimitKey,
        limit: EndpointLimit,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// Get current status without consuming quota.
    async fn status(
        &self,
        key: &RateLimitKey,
        limit: EndpointLimit,
    ) -> Result<RateLimitStatus, RateLimitError>;

    /// Clear the current window for a key (admin operation).
    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError>;
}

/// Who is being limited.
///
/// Resolution precedence is authenticated identity first, then
/// client-supplied address headers, then a shared bucket — forwarded
/// headers are spoofable, so an authenticated identity always wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientIdentity {
    /// An authenticated tenant of the host application.
    Tenant(TenantId),
    /// Best-effort client address from connection info or headers.
    Ip(String),
    /// Anonymous traffic with no usable address; one shared bucket.
    Shared,
}

impl ClientIdentity {
    /// The identifier component of the counter key.
    pub fn as_identifier(&self) -> String {
        match self {
            ClientIdentity::Tenant(id) => format!("tenant:{}", id),
            ClientIdentity::Ip(ip) => format!("ip:{}", ip),
            ClientIdentity::Shared => "shared".to_string(),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_identifier())
    }
}

/// Key identifying one counter: who, doing what.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    /// Resolved client identity.
    pub identifier: String,
    /// Endpoint name from the configured limit table.
    pub endpoint: String,
}

impl RateLimitKey {
    /// Creates a key from a resolved identity and an endpoint name.
    pub fn new(identity: &ClientIdentity, endpoint: impl Into<String>) -> Self {
        Self {
            identifier: identity.as_identifier(),
            endpoint: endpoint.into(),
        }
    }

    /// Returns the counter-store key string.
    pub fn to_counter_key(&self) -> String {
        format!("ratelimit:{}:{}", self.endpoint, self.identifier)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed; includes current status.
    Allowed(RateLimitStatus),
    /// Request is denied; includes denial details.
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    /// Returns true if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    /// Returns true if the request was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }

    /// Remaining quota in the current window; zero when denied.
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed(status) => status.remaining,
            RateLimitResult::Denied(_) => 0,
        }
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
    /// Window duration in seconds.
    pub window_secs: u32,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
    /// Human-readable message explaining the denial.
    pub message: String,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limiter backend is unavailable.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}
