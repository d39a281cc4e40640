//! Rate limiting middleware for axum.
//!
//! One middleware instance guards one named endpoint group; the limit and
//! the storage-failure policy come from the configured table. Status is
//! reported in standard headers:
//! - `X-RateLimit-Limit`: maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: requests remaining in the current window
//! - `X-RateLimit-Reset`: unix timestamp when the window resets
//! - `Retry-After`: seconds to wait (only on 429)
//!
//! # Example
//!
//! ```ignore
//! let state = RateLimitLayerState::new(limiter, config, "webhook");
//! let app = Router::new()
//!     .route("/webhooks/gocardless", post(handler))
//!     .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::adapters::rate_limiter::enforce;
use crate::config::RateLimitConfig;
use crate::domain::foundation::TenantId;
use crate::ports::{ClientIdentity, RateLimitKey, RateLimitResult, RateLimiter};

/// Request extension set by the host application's authentication layer.
#[derive(Debug, Clone)]
pub struct AuthenticatedTenant(pub TenantId);

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName =
        HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// State for one endpoint group's rate limit middleware.
#[derive(Clone)]
pub struct RateLimitLayerState {
    limiter: Arc<dyn RateLimiter>,
    config: Arc<RateLimitConfig>,
    endpoint: String,
}

impl RateLimitLayerState {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        config: Arc<RateLimitConfig>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            limiter,
            config,
            endpoint: endpoint.into(),
        }
    }
}

/// Resolves who a request counts against.
///
/// An authenticated tenant always wins; forwarded address headers are
/// client-supplied and spoofable, so they only identify anonymous traffic.
/// Precedence below the tenant is the first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then one shared bucket.
pub fn resolve_identifier(
    authenticated: Option<&TenantId>,
    headers: &HeaderMap,
) -> ClientIdentity {
    if let Some(tenant_id) = authenticated {
        return ClientIdentity::Tenant(tenant_id.clone());
    }

    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return ClientIdentity::Ip(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        if !real_ip.trim().is_empty() {
            return ClientIdentity::Ip(real_ip.trim().to_string());
        }
    }

    ClientIdentity::Shared
}

/// Enforces the endpoint group's limit before running the handler.
///
/// Denials answer 429 with retry headers; allowed requests carry status
/// headers on the way out. Storage failures follow the endpoint's
/// configured policy inside `enforce` and never surface to the client as
/// errors.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let tenant = request
        .extensions()
        .get::<AuthenticatedTenant>()
        .map(|t| t.0.clone());
    let identity = resolve_identifier(tenant.as_ref(), request.headers());
    let key = RateLimitKey::new(&identity, state.endpoint.as_str());

    let limit = state.config.limit_for(&state.endpoint);
    let policy = state.config.policy_for(&state.endpoint);

    match enforce(state.limiter.as_ref(), &key, limit, policy).await {
        RateLimitResult::Denied(denied) => {
            tracing::warn!(
                endpoint = %state.endpoint,
                identifier = %key.identifier,
                limit = denied.limit,
                "Request rate limited"
            );
            denied_response(
                denied.limit,
                denied.retry_after_secs,
                denied.reset_at.as_unix_secs(),
            )
        }
        RateLimitResult::Allowed(status) => {
            let mut response = next.run(request).await;
            add_status_headers(
                &mut response,
                status.limit,
                status.remaining,
                status.reset_at.as_unix_secs(),
            );
            response
        }
    }
}

/// Builds the 429 Too Many Requests response.
fn denied_response(limit: u32, retry_after_secs: u32, reset_at: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "Rate limit exceeded",
            "code": "RATE_LIMIT_EXCEEDED",
            "retry_after_secs": retry_after_secs
        })),
    )
        .into_response();

    add_status_headers(&mut response, limit, 0, reset_at);
    if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        response.headers_mut().insert("Retry-After", value);
    }

    response
}

fn add_status_headers(response: &mut Response, limit: u32, remaining: u32, reset_at: u64) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert(headers::X_RATELIMIT_LIMIT.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert(headers::X_RATELIMIT_REMAINING.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&reset_at.to_string()) {
        headers.insert(headers::X_RATELIMIT_RESET.clone(), value);
    }
}
