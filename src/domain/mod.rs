//! Domain layer for the connector.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (TenantId, Timestamp, errors)
//! - `connection` - A tenant's link to GoCardless and its lifecycle
//! - `oauth_state` - Single-use CSRF state tokens for the authorization flow

pub mod connection;
pub mod foundation;
pub mod oauth_state;
