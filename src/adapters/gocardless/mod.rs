//! GoCardless-facing adapters.
//!
//! - `webhook` - inbound signature verification and safe event parsing
//! - `client` - tenant-scoped REST client over the provider API
//! - `types` - provider API objects as they appear on the wire
//! - `error` - provider error bodies and their total extraction
//! - `oauth_exchanger` - authorization-code exchange against the connect host

pub mod client;
pub mod error;
pub mod oauth_exchanger;
pub mod types;
pub mod webhook;

pub use client::{new_idempotency_key, GoCardlessClient};
pub use error::{ApiError, ApiErrorCode, ProviderErrorBody};
pub use oauth_exchanger::GoCardlessTokenExchanger;
pub use webhook::{
    EventLogOptions, GcEvent, GcEventLinks, SignatureRejection, SignatureVerdict,
    WebhookParseError,
};
