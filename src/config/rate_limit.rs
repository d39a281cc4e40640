//! Per-endpoint rate limit configuration.
//!
//! Each protected operation gets its own (max requests, window) pair,
//! reflecting its sensitivity: webhook ingress tolerates far more
//! throughput than an administrative reconciliation action. Every entry
//! also names its storage-failure policy explicitly, so high-impact
//! endpoints can fail closed while the rest stay available.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::ValidationError;

/// One endpoint's quota: `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EndpointLimit {
    /// Maximum requests allowed in one window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
}

impl EndpointLimit {
    /// Convenience constructor.
    pub fn new(max_requests: u32, window_secs: u32) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// What a limiter does when its counter store is unreachable.
///
/// Fail-open trades strictness for availability: the limiter's own outage
/// cannot take down the feature it protects. Fail-closed inverts that for
/// endpoints where an unmetered burst is worse than an outage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Allow the request and log the limiter failure.
    #[default]
    FailOpen,
    /// Reject the request while the store is unreachable.
    FailClosed,
}

/// One configured endpoint entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointLimitEntry {
    /// Maximum requests allowed in one window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
    /// Behavior when the counter store fails.
    #[serde(default)]
    pub on_storage_failure: FailurePolicy,
}

impl EndpointLimitEntry {
    /// The (max, window) pair as passed to the limiter.
    pub fn limit(&self) -> EndpointLimit {
        EndpointLimit::new(self.max_requests, self.window_secs)
    }
}

/// The per-endpoint limit table.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Applied when an endpoint has no explicit entry.
    #[serde(default = "default_fallback")]
    pub fallback: EndpointLimitEntry,

    /// Explicit per-endpoint entries, keyed by endpoint name.
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointLimitEntry>,
}

fn default_fallback() -> EndpointLimitEntry {
    EndpointLimitEntry {
        max_requests: 60,
        window_secs: 60,
        on_storage_failure: FailurePolicy::FailOpen,
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut endpoints = HashMap::new();
        // Webhook ingress: the provider batches and redelivers aggressively.
        endpoints.insert(
            "webhook".to_string(),
            EndpointLimitEntry {
                max_requests: 600,
                window_secs: 60,
                on_storage_failure: FailurePolicy::FailOpen,
            },
        );
        // General outbound API actions triggered by users.
        endpoints.insert(
            "api".to_string(),
            EndpointLimitEntry {
                max_requests: 120,
                window_secs: 60,
                on_storage_failure: FailurePolicy::FailOpen,
            },
        );
        // OAuth start/callback, per tenant.
        endpoints.insert(
            "oauth".to_string(),
            EndpointLimitEntry {
                max_requests: 30,
                window_secs: 60,
                on_storage_failure: FailurePolicy::FailOpen,
            },
        );
        // Administrative reconciliation: lowest quota, and the one place
        // where an unmetered burst is worse than unavailability.
        endpoints.insert(
            "admin_reconcile".to_string(),
            EndpointLimitEntry {
                max_requests: 5,
                window_secs: 300,
                on_storage_failure: FailurePolicy::FailClosed,
            },
        );
        Self {
            fallback: default_fallback(),
            endpoints,
        }
    }
}

impl RateLimitConfig {
    /// Looks up the entry for an endpoint, falling back to the default.
    pub fn entry_for(&self, endpoint: &str) -> &EndpointLimitEntry {
        self.endpoints.get(endpoint).unwrap_or(&self.fallback)
    }

    /// The (max, window) pair for an endpoint.
    pub fn limit_for(&self, endpoint: &str) -> EndpointLimit {
        self.entry_for(endpoint).limit()
    }

    /// The storage-failure policy for an endpoint.
    pub fn policy_for(&self, endpoint: &str) -> FailurePolicy {
        self.entry_for(endpoint).on_storage_failure
    }

    /// Validate the limit table.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fallback = ("fallback".to_string(), &self.fallback);
        for (name, entry) in self.endpoints.iter().chain(std::iter::once((
            &fallback.0,
            fallback.1,
        ))) {
            if entry.max_requests == 0 {
                return Err(ValidationError::ZeroRateLimit(name.clone()));
            }
            if entry.window_secs == 0 {
                return Err(ValidationError::ZeroRateWindow(name.clone()));
            }
        }
        Ok(())
    }
}
