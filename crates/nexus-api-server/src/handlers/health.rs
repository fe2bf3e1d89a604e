use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::cache::RedisCache;
use crate::database::Repository;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn readiness_check(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(cache): Extension<RedisCache>,
) -> StatusCode {
    if let Err(e) = repository.pool.ping().await {
        warn!("Readiness check failed: {}", e);
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    // Cache outage is not fatal: the limiter fails open without it
    if let Err(e) = cache.ping().await {
        warn!("Redis unreachable (rate limiting degraded): {}", e);
    }

    StatusCode::OK
}
