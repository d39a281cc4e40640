//! Redis-backed rate limiter for multi-server deployments.
//!
//! Fixed-window counter with INCR + EXPIRE. The increment is atomic, so
//! concurrent requests across servers cannot race past the limit; the
//! known softness is at window boundaries, where a burst can briefly see
//! two windows.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::EndpointLimit;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Redis-backed fixed-window limiter.
///
/// 1. INCR the counter key
/// 2. on count == 1, EXPIRE it for the window duration
/// 3. count above the limit denies the request
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
}

impl RedisRateLimiter {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_and_consume(
        &self,
        key: &RateLimitKey,
        limit: EndpointLimit,
    ) -> Result<RateLimitResult, RateLimitError> {
        let counter_key = key.to_counter_key();
        let mut conn = self.conn.clone();

        let count: i64 = conn
            .incr(&counter_key, 1_i64)
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;

        // First request in the window starts the clock.
        if count == 1 {
            conn.expire::<_, ()>(&counter_key, limit.window_secs as i64)
                .await
                .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;
        }

        let ttl: i64 = conn
            .ttl(&counter_key)
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;

        let now = Timestamp::now().as_unix_secs();
        let reset_secs = if ttl > 0 {
            ttl as u64
        } else {
            limit.window_secs as u64
        };
        let reset_at = Timestamp::from_unix_secs(now + reset_secs);

        if count as u32 > limit.max_requests {
            let retry_after = reset_secs as u32;
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: limit.max_requests,
                retry_after_secs: retry_after.max(1),
                reset_at,
                message: format!(
                    "Rate limit exceeded for {}. Retry after {} seconds.",
                    key.endpoint, retry_after
                ),
            }));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit: limit.max_requests,
            remaining: limit.max_requests.saturating_sub(count as u32),
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
        let mut conn = self.conn.clone();

        let count: Option<i64> = conn
            .get(&counter_key)
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;
        let count = count.unwrap_or(0) as u32;

        let ttl: i64 = conn
            .ttl(&counter_key)
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;

        let now = Timestamp::now().as_unix_secs();
        let reset_secs = if ttl > 0 {
            ttl as u64
        } else {
            limit.window_secs as u64
        };

        Ok(RateLimitStatus {
            limit: limit.max_requests,
            remaining: limit.max_requests.saturating_sub(count),
            reset_at: Timestamp::from_unix_secs(now + reset_secs),
            window_secs: limit.window_secs,
        })
    }

    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key.to_counter_key())
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter").finish_non_exhaustive()
    }
}
