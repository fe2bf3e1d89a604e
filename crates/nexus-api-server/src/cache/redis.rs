use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, Script};
use tracing::info;

use super::{CacheError, CounterStore};
use crate::config::RedisConfig;

/// INCR and EXPIRE run as one script so a counter key can never exist
/// without its window TTL, even if the connection dies mid-call.
const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Shared Redis handle. ConnectionManager multiplexes and reconnects
/// internally, so clones are cheap.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    incr_script: Script,
}

impl RedisCache {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())?;
        let manager = client.get_connection_manager().await?;
        info!("Redis connection established");
        Ok(Self {
            manager,
            incr_script: Script::new(INCR_WINDOW_SCRIPT),
        })
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisCache {
    async fn incr_window(&self, key: &str, window_secs: i64) -> Result<i64, CacheError> {
        let mut conn = self.manager.clone();

        // The TTL is attached only by the increment that creates the key, so
        // the window start stays fixed at first-write time under concurrency.
        let count: i64 = self
            .incr_script
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await?;

        Ok(count)
    }
}
