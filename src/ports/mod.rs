//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the connector core and the outside world. Adapters implement them.
//!
//! - `ConnectionRepository` - persisted tenant connections (upsert on tenant id)
//! - `OAuthStateRepository` - single-use CSRF state rows with atomic consumption
//! - `RateLimiter` - atomic quota counters keyed by (identifier, endpoint)
//! - `AccessTokenExchanger` - the authorization-code exchange leg of OAuth

mod connection_repository;
mod oauth_state_repository;
mod rate_limiter;
mod token_exchanger;

pub use connection_repository::ConnectionRepository;
pub use oauth_state_repository::OAuthStateRepository;
pub use rate_limiter::{
    ClientIdentity, RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult,
    RateLimitStatus, RateLimiter,
};
pub use token_exchanger::{AccessTokenExchanger, AccessTokenGrant, ExchangeError};
