//! Per-client rate limiting for `/api` routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::request::client_ip;
use crate::http::response::ApiResponse;

const PRUNE_THRESHOLD: usize = 10_000;

/// A token bucket refilled continuously at `capacity / window`.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    enabled: bool,
    capacity: f64,
    refill_rate: f64,
    window: Duration,
    exempt_paths: Vec<String>,
    trust_proxy: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs.max(1));
        let capacity = config.max_requests as f64;
        Self {
            buckets: DashMap::new(),
            enabled: config.enabled,
            capacity,
            refill_rate: capacity / window.as_secs_f64(),
            window,
            exempt_paths: config.exempt_paths.clone(),
            trust_proxy: config.trust_proxy,
        }
    }

    /// Whether `path` is subject to limiting at all.
    pub fn applies_to(&self, path: &str) -> bool {
        self.enabled
            && path.starts_with("/api/")
            && !self.exempt_paths.iter().any(|exempt| path.starts_with(exempt.as_str()))
    }

    /// Consume one request from `key`'s budget.
    pub fn check(&self, key: &str) -> bool {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        let capacity = self.capacity;
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity))
            .try_acquire(capacity, self.refill_rate)
    }

    /// Drop buckets idle for a full window; they would be full again anyway.
    fn prune(&self) {
        let window = self.window;
        self.buckets
            .retain(|_, bucket| bucket.last_update.elapsed() < window);
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let key = client_ip(&request, limiter.trust_proxy)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        ApiResponse::message(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests from this IP, please try again later.",
        )
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::ConnectInfo, middleware, routing::get, Router};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_secs: 60,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn test_scope() {
        let limiter = limiter(10);
        assert!(limiter.applies_to("/api/services"));
        assert!(!limiter.applies_to("/api/admin/login"));
        assert!(!limiter.applies_to("/api/admin/register"));
        assert!(!limiter.applies_to("/health"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_and_refill() {
        let limiter = limiter(3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    fn limited_router(trust_proxy: bool) -> Router {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
            max_requests: 3,
            window_secs: 60,
            trust_proxy,
            ..RateLimitConfig::default()
        }));
        Router::new()
            .route("/api/services", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    }

    async fn status_from(router: &Router, peer: [u8; 4], forwarded: &str) -> StatusCode {
        let mut request = Request::builder()
            .uri("/api/services")
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_header_does_not_split_budget() {
        let router = limited_router(false);

        let mut allowed = 0;
        for i in 0..50 {
            let spoofed = format!("198.51.100.{}", i);
            if status_from(&router, [203, 0, 113, 9], &spoofed).await == StatusCode::OK {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);

        // A different peer still has its own budget.
        assert_eq!(status_from(&router, [203, 0, 113, 10], "198.51.100.1").await, StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_header_honored_behind_trusted_proxy() {
        let router = limited_router(true);

        for _ in 0..3 {
            assert_eq!(status_from(&router, [10, 0, 0, 1], "198.51.100.7").await, StatusCode::OK);
        }
        assert_eq!(
            status_from(&router, [10, 0, 0, 1], "198.51.100.7").await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_from(&router, [10, 0, 0, 1], "198.51.100.8").await, StatusCode::OK);
    }
}
