//! Adapters - Implementations of ports and provider-facing components.

pub mod gocardless;
pub mod http;
pub mod memory;
pub mod oauth;
pub mod postgres;
pub mod rate_limiter;
pub mod vault;
