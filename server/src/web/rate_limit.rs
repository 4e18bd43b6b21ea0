use crate::web::api::ErrorResponse;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use std::{collections::HashMap, net::SocketAddr, num::NonZeroU32, sync::Arc};
use tokio::sync::RwLock;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Upper bound on tracked clients before the limiter map is reset.
const CLEANUP_THRESHOLD: usize = 10_000;

/// Per-client-IP rate limiter. Each key gets its own token bucket with the
/// shared quota.
pub struct RateLimitState {
    limiters: RwLock<HashMap<String, Arc<Limiter>>>,
    quota: Quota,
}

impl RateLimitState {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let quota =
            Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
                .allow_burst(NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN));
        Self {
            limiters: RwLock::new(HashMap::new()),
            quota,
        }
    }

    /// Checks whether the key may proceed, creating its bucket on first sight.
    pub async fn check(&self, key: &str) -> bool {
        let limiter = {
            let limiters = self.limiters.read().await;
            limiters.get(key).cloned()
        };

        let limiter = match limiter {
            Some(limiter) => limiter,
            None => {
                let mut limiters = self.limiters.write().await;
                if limiters.len() > CLEANUP_THRESHOLD {
                    limiters.clear();
                }
                limiters
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
                    .clone()
            }
        };

        limiter.check().is_ok()
    }
}

/// Client key for rate limiting: X-Forwarded-For when behind a proxy, else
/// the peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients that exceed the configured quota.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if state.check(&key).await {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", "1")],
            Json(ErrorResponse::new(
                "RATE_LIMITED",
                "Too many requests. Please slow down.",
            )),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn can_exhaust_burst_for_a_single_client() {
        let state = RateLimitState::new(1, 3);
        assert!(state.check("10.0.0.1").await);
        assert!(state.check("10.0.0.1").await);
        assert!(state.check("10.0.0.1").await);
        assert!(!state.check("10.0.0.1").await);
    }

    #[tokio::test]
    async fn can_track_clients_independently() {
        let state = RateLimitState::new(1, 1);
        assert!(state.check("10.0.0.1").await);
        assert!(!state.check("10.0.0.1").await);
        assert!(state.check("10.0.0.2").await);
    }
}
