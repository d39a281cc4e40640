//! Rate limiter adapters and policy-aware enforcement.

mod in_memory;
mod redis;

pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;

use crate::config::{EndpointLimit, FailurePolicy};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Checks a key against a limit, applying the endpoint's storage-failure
/// policy when the counter store is unreachable.
///
/// Fail-open turns a limiter outage into an allowed request plus a warning
/// log; fail-closed turns it into a denial with a short retry hint. Either
/// way the caller gets a plain `RateLimitResult` and never sees the store
/// error.
pub async fn enforce(
    limiter: &dyn RateLimiter,
    key: &RateLimitKey,
    limit: EndpointLimit,
    policy: FailurePolicy,
) -> RateLimitResult {
    match limiter.check_and_consume(key, limit).await {
        Ok(result) => result,
        Err(error) => match policy {
            FailurePolicy::FailOpen => {
                tracing::warn!(
                    endpoint = %key.endpoint,
                    identifier = %key.identifier,
                    error = %error,
                    "Rate limiter unavailable, allowing request (fail-open)"
                );
                RateLimitResult::Allowed(RateLimitStatus {
                    limit: limit.max_requests,
                    remaining: limit.max_requests,
                    reset_at: Timestamp::now().add_seconds(limit.window_secs as i64),
                    window_secs: limit.window_secs,
                })
            }
            FailurePolicy::FailClosed => {
                tracing::error!(
                    endpoint = %key.endpoint,
                    identifier = %key.identifier,
                    error = %error,
                    "Rate limiter unavailable, rejecting request (fail-closed)"
                );
                RateLimitResult::Denied(RateLimitDenied {
                    limit: limit.max_requests,
                    retry_after_secs: limit.window_secs.max(1),
                    reset_at: Timestamp::now().add_seconds(limit.window_secs as i64),
                    message: "Rate limiting temporarily unavailable. Retry later.".to_string(),
                })
            }
        },
    }
}
