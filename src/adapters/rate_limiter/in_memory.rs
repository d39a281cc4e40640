//! In-memory rate limiter for testing and single-server deployments.
//!
//! Fixed-window counter over a HashMap. Not suitable for multi-server
//! deployments; counters live in one process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::EndpointLimit;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// In-memory fixed-window limiter.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    /// Per-key window state.
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

/// State for a single window.
#[derive(Debug, Clone)]
struct WindowState {
    /// Requests counted in the current window.
    count: u32,
    /// When the current window started.
    window_start: u64,
    /// Window duration in seconds.
    window_secs: u32,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_secs() -> u64 {
        Timestamp::now().as_unix_secs()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_consume(
        &self,
        key: &RateLimitKey,
        limit: EndpointLimit,
    ) -> Result<RateLimitResult, RateLimitError> {
        let counter_key = key.to_counter_key();
        let now = Self::now_secs();

        let mut windows = self.windows.write().await;

        let state = windows.entry(counter_key).or_insert_with(|| WindowState {
            count: 0,
            window_start: now,
            window_secs: limit.window_secs,
        });

        // Roll the window if it has elapsed.
        let window_end = state.window_start + state.window_secs as u64;
        if now >= window_end {
            state.count = 0;
            state.window_start = now;
            state.window_secs = limit.window_secs;
        }

        if state.count >= limit.max_requests {
            let retry_after =
                (state.window_start + state.window_secs as u64).saturating_sub(now) as u32;
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: limit.max_requests,
                retry_after_secs: retry_after.max(1),
                reset_at: Timestamp::from_unix_secs(
                    state.window_start + state.window_secs as u64,
                ),
                message: format!(
                    "Rate limit exceeded for {}. Retry after {} seconds.",
                    key.endpoint, retry_after
                ),
            }));
        }

        state.count += 1;
        let remaining = limit.max_requests.saturating_sub(state.count);
        let reset_at = Timestamp::from_unix_secs(state.window_start + state.window_secs as u64);

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit: limit.max_requests,
            remaining,
            reset_at,
            window_secs: limit.window_secs,
        }))
    }

    async fn status(
        &self,
        key: &RateLimitKey,
        limit: EndpointLimit,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let counter_key = key.to_counter_key();
        let now = Self::now_secs();

        let windows = self.windows.read().await;

        let (count, window_start) = windows
            .get(&counter_key)
            .map(|state| {
                let window_end = state.window_start + state.window_secs as u64;
                if now >= window_end {
                    (0, now)
                } else {
                    (state.count, state.window_start)
                }
            })
            .unwrap_or((0, now));

        Ok(RateLimitStatus {
            limit: limit.max_requests,
            remaining: limit.max_requests.saturating_sub(count),
            reset_at: Timestamp::from_unix_secs(window_start + limit.window_secs as u64),
            window_secs: limit.window_secs,
        })
    }

    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError> {
        let mut windows = self.windows.write().await;
        windows.remove(&key.to_counter_key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ClientIdentity;

    fn webhook_key(ip: &str) -> RateLimitKey {
        RateLimitKey::new(&ClientIdentity::Ip(ip.to_string()), "webhook")
    }

    #[tokio::test]
    async fn consumes_quota_down_to_zero_then_denies() {
        let limiter = InMemoryRateLimiter::new();
        let key = webhook_key("203.0.113.7");
        let limit = EndpointLimit::new(3, 60);

        for expected_remaining in [2u32, 1, 0] {
            let result = limiter.check_and_consume(&key, limit).await.unwrap();
            match result {
                RateLimitResult::Allowed(status) => {
                    assert_eq!(status.remaining, expected_remaining);
                    assert_eq!(status.limit, 3);
                }
                RateLimitResult::Denied(_) => panic!("should still be within quota"),
            }
        }

        let result = limiter.check_and_consume(&key, limit).await.unwrap();
        let RateLimitResult::Denied(denied) = result else {
            panic!("fourth request must be denied");
        };
        assert_eq!(denied.limit, 3);
        assert!(denied.retry_after_secs >= 1);
        assert!(denied.retry_after_secs <= 60);
    }

    #[tokio::test]
    async fn window_elapse_restores_quota() {
        let limiter = InMemoryRateLimiter::new();
        let key = webhook_key("203.0.113.8");
        // A zero-length window is already elapsed on the next call.
        let limit = EndpointLimit::new(1, 0);

        assert!(limiter
            .check_and_consume(&key, limit)
            .await
            .unwrap()
            .is_allowed());
        assert!(limiter
            .check_and_consume(&key, limit)
            .await
            .unwrap()
            .is_allowed());
    }

    #[tokio::test]
    async fn different_identifiers_count_independently() {
        let limiter = InMemoryRateLimiter::new();
        let limit = EndpointLimit::new(1, 60);

        let a = webhook_key("198.51.100.1");
        let b = webhook_key("198.51.100.2");

        assert!(limiter.check_and_consume(&a, limit).await.unwrap().is_allowed());
        assert!(limiter.check_and_consume(&a, limit).await.unwrap().is_denied());
        assert!(limiter.check_and_consume(&b, limit).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn different_endpoints_count_independently() {
        let limiter = InMemoryRateLimiter::new();
        let limit = EndpointLimit::new(1, 60);
        let identity = ClientIdentity::Ip("198.51.100.3".to_string());

        let webhook = RateLimitKey::new(&identity, "webhook");
        let api = RateLimitKey::new(&identity, "api");

        assert!(limiter
            .check_and_consume(&webhook, limit)
            .await
            .unwrap()
            .is_allowed());
        assert!(limiter
            .check_and_consume(&webhook, limit)
            .await
            .unwrap()
            .is_denied());
        assert!(limiter.check_and_consume(&api, limit).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn status_does_not_consume() {
        let limiter = InMemoryRateLimiter::new();
        let key = webhook_key("203.0.113.9");
        let limit = EndpointLimit::new(10, 60);

        let status = limiter.status(&key, limit).await.unwrap();
        assert_eq!(status.remaining, 10);

        for _ in 0..3 {
            limiter.check_and_consume(&key, limit).await.unwrap();
        }

        let status = limiter.status(&key, limit).await.unwrap();
        assert_eq!(status.remaining, 7);
        let again = limiter.status(&key, limit).await.unwrap();
        assert_eq!(again.remaining, 7);
    }

    #[tokio::test]
    async fn reset_clears_the_window() {
        let limiter = InMemoryRateLimiter::new();
        let key = webhook_key("203.0.113.10");
        let limit = EndpointLimit::new(1, 60);

        limiter.check_and_consume(&key, limit).await.unwrap();
        assert!(limiter.check_and_consume(&key, limit).await.unwrap().is_denied());

        limiter.reset(&key).await.unwrap();
        assert!(limiter.check_and_consume(&key, limit).await.unwrap().is_allowed());
    }
}
