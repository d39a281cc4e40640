//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the persistence ports.
///
/// Repository implementations map backend failures into these variants so
/// callers can distinguish "the row isn't there" from "the store is down"
/// without inspecting backend-specific error strings.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A stored value could not be mapped back into a domain type.
    #[error("corrupt {entity} record: {reason}")]
    Corrupt { entity: &'static str, reason: String },

    /// The backing store rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a backend error from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        StorageError::Backend(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages_name_the_field() {
        let err = ValidationError::empty_field("tenant_id");
        assert!(err.to_string().contains("tenant_id"));

        let err = ValidationError::invalid_format("key", "not base64");
        assert!(err.to_string().contains("not base64"));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::NotFound { entity: "connection" };
        assert_eq!(err.to_string(), "connection not found");

        let err = StorageError::backend("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
