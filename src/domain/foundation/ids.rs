//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Identifier of an isolated customer account in the host application.
///
/// Credentials, connections, and rate-limit buckets are all partitioned
/// by tenant. The host assigns these; the connector only requires them
/// to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new TenantId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("tenant_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_tenant_id() {
        assert!(TenantId::new("").is_err());
    }

    #[test]
    fn accepts_non_empty_tenant_id() {
        let id = TenantId::new("C1").unwrap();
        assert_eq!(id.as_str(), "C1");
        assert_eq!(id.to_string(), "C1");
    }
}
