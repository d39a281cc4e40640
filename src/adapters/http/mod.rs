//! HTTP-facing adapters for the host application.

pub mod rate_limit;

pub use rate_limit::{
    rate_limit_middleware, resolve_identifier, AuthenticatedTenant, RateLimitLayerState,
};
