//! Shared domain primitives.

mod errors;
mod ids;
mod timestamp;

pub use errors::{StorageError, ValidationError};
pub use ids::TenantId;
pub use timestamp::Timestamp;
