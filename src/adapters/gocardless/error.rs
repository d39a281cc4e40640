//! Provider API errors and their total extraction.
//!
//! GoCardless error bodies are nested, optional-everywhere JSON. They are
//! modeled as a struct of explicit optional fields, filled by a total
//! extractor that never fails on a missing or oddly typed field — a
//! malformed error body must not turn into a second error while reporting
//! the first.

use serde::{Deserialize, Serialize};

/// How much of a provider error message survives into our logs/errors.
const MESSAGE_TRUNCATE_LEN: usize = 200;

/// What went wrong talking to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    /// The tenant has no active connection to act through.
    NoActiveConnection,
    /// The stored credential could not be decrypted.
    CredentialDecryption,
    /// The request never completed (DNS, TLS, timeout).
    Network,
    /// The provider answered non-2xx.
    Provider,
    /// The provider answered 2xx but the body was not the expected shape.
    InvalidResponse,
}

/// Error from the tenant-scoped API client.
///
/// Carries the redacted reason and the provider's request id for support
/// correlation; never the full response body and never the token.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error class.
    pub code: ApiErrorCode,
    /// Redacted, truncated description.
    pub message: String,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    /// Provider request id for support correlation.
    pub request_id: Option<String>,
}

impl ApiError {
    /// Creates an error with just a code and message.
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            request_id: None,
        }
    }

    /// Network-level failure.
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorCode::Network, cause.to_string())
    }

    /// Non-2xx provider response, built from the extracted error body.
    pub fn provider(status: u16, body: ProviderErrorBody) -> Self {
        let message = match (&body.error_type, &body.message) {
            (Some(t), Some(m)) => format!("{}: {}", t, truncate(m)),
            (Some(t), None) => t.clone(),
            (None, Some(m)) => truncate(m),
            (None, None) => "provider returned an error".to_string(),
        };
        Self {
            code: ApiErrorCode::Provider,
            message,
            status: Some(status),
            request_id: body.request_id,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "GoCardless API error ({}): {}", status, self.message),
            None => write!(f, "GoCardless API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// The useful fields of a provider error body, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderErrorBody {
    /// Provider error class (e.g. "validation_failed").
    pub error_type: Option<String>,
    /// Human-readable summary.
    pub message: Option<String>,
    /// Provider request id for support correlation.
    pub request_id: Option<String>,
}

impl ProviderErrorBody {
    /// Total extraction from a raw response body.
    ///
    /// Accepts anything: invalid JSON, a non-object, an object without the
    /// `error` envelope, or an envelope with missing/mistyped fields all
    /// yield a body with the corresponding fields unset.
    pub fn extract(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return Self::default();
        };
        let error = value.get("error").unwrap_or(&value);

        Self {
            error_type: string_field(error, "type"),
            message: string_field(error, "message"),
            request_id: string_field(error, "request_id"),
        }
    }
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MESSAGE_TRUNCATE_LEN {
        message.to_string()
    } else {
        let cut: String = message.chars().take(MESSAGE_TRUNCATE_LEN).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_full_error_envelope() {
        let raw = r#"{"error":{"type":"validation_failed","message":"Currency is invalid","request_id":"RQ123","code":422}}"#;
        let body = ProviderErrorBody::extract(raw);
        assert_eq!(body.error_type.as_deref(), Some("validation_failed"));
        assert_eq!(body.message.as_deref(), Some("Currency is invalid"));
        assert_eq!(body.request_id.as_deref(), Some("RQ123"));
    }

    #[test]
    fn extraction_is_total_on_garbage() {
        assert_eq!(ProviderErrorBody::extract("not json"), ProviderErrorBody::default());
        assert_eq!(ProviderErrorBody::extract("[1,2,3]"), ProviderErrorBody::default());
        assert_eq!(ProviderErrorBody::extract(""), ProviderErrorBody::default());
    }

    #[test]
    fn extraction_tolerates_missing_fields() {
        let body = ProviderErrorBody::extract(r#"{"error":{"message":"boom"}}"#);
        assert_eq!(body.message.as_deref(), Some("boom"));
        assert!(body.error_type.is_none());
        assert!(body.request_id.is_none());
    }

    #[test]
    fn extraction_tolerates_mistyped_fields() {
        let body = ProviderErrorBody::extract(r#"{"error":{"type":42,"message":["x"],"request_id":null}}"#);
        assert_eq!(body, ProviderErrorBody::default());
    }

    #[test]
    fn extraction_accepts_flat_bodies() {
        let body = ProviderErrorBody::extract(r#"{"type":"invalid_api_usage","message":"nope"}"#);
        assert_eq!(body.error_type.as_deref(), Some("invalid_api_usage"));
    }

    #[test]
    fn provider_error_carries_status_and_request_id() {
        let body = ProviderErrorBody::extract(r#"{"error":{"type":"invalid_state","message":"Mandate is cancelled","request_id":"RQ9"}}"#);
        let err = ApiError::provider(409, body);
        assert_eq!(err.code, ApiErrorCode::Provider);
        assert_eq!(err.status, Some(409));
        assert_eq!(err.request_id.as_deref(), Some("RQ9"));
        assert!(err.to_string().contains("409"));
        assert!(err.message.contains("invalid_state"));
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(500);
        let body = ProviderErrorBody {
            message: Some(long),
            ..Default::default()
        };
        let err = ApiError::provider(500, body);
        assert!(err.message.chars().count() <= MESSAGE_TRUNCATE_LEN + 1);
    }
}
