//! Rate limiting for the credential endpoints.
//!
//! Uses a token bucket per client IP to slow down password guessing and
//! account spam.

use axum::{
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::{debug, warn};

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Quotas for the credential endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Sustained login attempts per second per IP
    pub login_per_second: NonZeroU32,
    /// Login attempts allowed in a burst
    pub login_burst: NonZeroU32,
    /// Registrations per minute per IP
    pub register_per_minute: NonZeroU32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login_per_second: NonZeroU32::MIN,
            login_burst: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            register_per_minute: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl RateLimits {
    /// Limits high enough to never trigger in a test run.
    pub fn generous() -> Self {
        let many = NonZeroU32::new(10_000).unwrap_or(NonZeroU32::MAX);
        Self {
            login_per_second: many,
            login_burst: many,
            register_per_minute: many,
        }
    }
}

/// Rate limiting state shared by the middleware.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub register: Arc<IpLimiter>,
    /// Proxy header carrying the client IP, if any
    pub ip_header: Option<HeaderName>,
}

impl RateLimitConfig {
    pub fn new(limits: RateLimits, ip_header: Option<HeaderName>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(limits.login_per_second).allow_burst(limits.login_burst),
            )),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(
                limits.register_per_minute,
            ))),
            ip_header,
        }
    }
}

fn check(
    limiter: &IpLimiter,
    ip_header: Option<&HeaderName>,
    request: &Request,
) -> Result<(), Response> {
    let ip = extract_client_ip(request, ip_header).map_err(|reason| {
        warn!(reason, "Unable to determine client IP");
        (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response()
    })?;

    limiter.check_key(&ip).map_err(|_| {
        debug!(ip = %ip, "Rate limit hit");
        (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please wait before trying again.",
        )
            .into_response()
    })
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config.login, config.ip_header.as_ref(), &request) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config.register, config.ip_header.as_ref(), &request) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}
