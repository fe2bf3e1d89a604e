pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use self::redis::RedisCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Atomic counter primitives backing the fixed-window rate limiter.
/// Correctness relies on the store's INCR/EXPIRE atomicity, not on
/// in-process locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, attaching the window TTL only when
    /// this increment created the key. Returns the count after increment.
    async fn incr_window(&self, key: &str, window_secs: i64) -> Result<i64, CacheError>;
}
