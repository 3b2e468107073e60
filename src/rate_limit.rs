//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down credential
//! guessing and signup spam.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde::Serialize;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::auth::extract_client_ip;

/// Default budget for login and register, per IP.
pub const DEFAULT_AUTH_REQUESTS_PER_MINUTE: u32 = 20;

/// Interval between sweeps of idle limiter keys.
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Key used when the client address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Shared by login and register
    pub auth: Arc<IpLimiter>,
    /// Key on the first `X-Forwarded-For` entry instead of the peer address
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    /// A limit of zero is treated as one request per minute.
    pub fn new(auth_per_minute: u32, trust_forwarded_for: bool) -> Self {
        let per_minute = NonZeroU32::new(auth_per_minute).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_minute(per_minute), trust_forwarded_for)
    }

    pub fn with_quota(quota: Quota, trust_forwarded_for: bool) -> Self {
        Self {
            auth: Arc::new(RateLimiter::keyed(quota)),
            trust_forwarded_for,
        }
    }

    /// Forget clients whose budget has fully replenished.
    pub fn prune(&self) {
        let before = self.auth.len();
        self.auth.retain_recent();
        self.auth.shrink_to_fit();
        let removed = before.saturating_sub(self.auth.len());
        if removed > 0 {
            debug!(removed, "Pruned idle rate limit keys");
        }
    }
}

/// Spawn a background task that prunes idle limiter keys periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_limiter_cleanup(config: Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            config.prune();
        }
    })
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_REQUESTS_PER_MINUTE, false)
    }
}

#[derive(Serialize)]
struct RateLimitedResponse {
    error: &'static str,
}

/// Middleware for rate limiting login and register.
pub async fn rate_limit_auth(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, config.trust_forwarded_for)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match config.auth.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Authentication rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitedResponse {
                    error: "Too many requests. Please try again later.",
                }),
            )
                .into_response()
        }
    }
}
