use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::CounterStore;
use crate::config::RateLimitConfig;
use crate::utils::error::ApiError;

const KEY_PREFIX: &str = "rate_limit:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

/// What to do when the counter store is unreachable. `Allow` keeps the API
/// available at the cost of enforcement; `Deny` enforces strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    Allow,
    Deny,
}

/// Fixed-window request limiter: one counter per client key, reset entirely
/// when the window TTL expires.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: i64,
    window_seconds: i64,
    fallback: FallbackPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.requests_per_minute.max(1),
            window_seconds: config.window_seconds.max(1),
            fallback: config.on_store_unavailable,
        }
    }

    pub async fn admit(&self, client_key: &str) -> Admission {
        let key = format!("{}{}", KEY_PREFIX, client_key);

        match self.store.incr_window(&key, self.window_seconds).await {
            Ok(count) if count <= self.limit => {
                debug!("Client {} at {}/{} in window", client_key, count, self.limit);
                Admission::Allowed
            }
            Ok(count) => {
                warn!(
                    "Client {} exceeded rate limit ({} > {})",
                    client_key, count, self.limit
                );
                Admission::Rejected
            }
            Err(e) => {
                warn!(
                    "Counter store unavailable ({}), applying fallback policy {:?}",
                    e, self.fallback
                );
                match self.fallback {
                    FallbackPolicy::Allow => Admission::Allowed,
                    FallbackPolicy::Deny => Admission::Rejected,
                }
            }
        }
    }
}

/// Rate-limit middleware - gates every request before business logic
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limiter = request
        .extensions()
        .get::<Arc<RateLimiter>>()
        .ok_or_else(|| ApiError::InternalError("Rate limiter not configured".to_string()))?
        .clone();

    match limiter.admit(&addr.ip().to_string()).await {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::Rejected => Err(ApiError::TooManyRequests(
            "Rate limit exceeded. Please try again later.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MockCounterStore};
    use crate::config::RateLimitConfig;

    fn config(policy: FallbackPolicy) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: 60,
            window_seconds: 60,
            on_store_unavailable: policy,
        }
    }

    fn redis_err() -> CacheError {
        CacheError::Redis(redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    #[tokio::test]
    async fn test_window_admits_up_to_limit() {
        let mut store = MockCounterStore::new();
        let mut count = 0i64;
        store
            .expect_incr_window()
            .times(61)
            .returning(move |_, _| {
                count += 1;
                Ok(count)
            });

        let limiter = RateLimiter::new(Arc::new(store), &config(FallbackPolicy::Allow));

        for _ in 0..60 {
            assert_eq!(limiter.admit("10.0.0.1").await, Admission::Allowed);
        }
        // 61st request in the same window is rejected
        assert_eq!(limiter.admit("10.0.0.1").await, Admission::Rejected);
    }

    #[tokio::test]
    async fn test_expired_window_resets_counter() {
        let mut store = MockCounterStore::new();
        let mut seq = vec![1i64, 61, 1].into_iter();
        store
            .expect_incr_window()
            .times(3)
            .returning(move |_, _| Ok(seq.next().unwrap()));

        let limiter = RateLimiter::new(Arc::new(store), &config(FallbackPolicy::Allow));

        assert_eq!(limiter.admit("10.0.0.2").await, Admission::Allowed);
        assert_eq!(limiter.admit("10.0.0.2").await, Admission::Rejected);
        // TTL elapsed: the store starts a fresh count
        assert_eq!(limiter.admit("10.0.0.2").await, Admission::Allowed);
    }

    #[tokio::test]
    async fn test_store_unavailable_fails_open() {
        let mut store = MockCounterStore::new();
        store
            .expect_incr_window()
            .returning(|_, _| Err(redis_err()));

        let limiter = RateLimiter::new(Arc::new(store), &config(FallbackPolicy::Allow));
        assert_eq!(limiter.admit("10.0.0.3").await, Admission::Allowed);
    }

    #[tokio::test]
    async fn test_store_unavailable_deny_policy() {
        let mut store = MockCounterStore::new();
        store
            .expect_incr_window()
            .returning(|_, _| Err(redis_err()));

        let limiter = RateLimiter::new(Arc::new(store), &config(FallbackPolicy::Deny));
        assert_eq!(limiter.admit("10.0.0.4").await, Admission::Rejected);
    }

    #[tokio::test]
    async fn test_clients_are_counted_separately() {
        let mut store = MockCounterStore::new();
        store
            .expect_incr_window()
            .withf(|key, _| key == "rate_limit:10.0.0.5")
            .returning(|_, _| Ok(61));
        store
            .expect_incr_window()
            .withf(|key, _| key == "rate_limit:10.0.0.6")
            .returning(|_, _| Ok(1));

        let limiter = RateLimiter::new(Arc::new(store), &config(FallbackPolicy::Allow));
        assert_eq!(limiter.admit("10.0.0.5").await, Admission::Rejected);
        assert_eq!(limiter.admit("10.0.0.6").await, Admission::Allowed);
    }
}
