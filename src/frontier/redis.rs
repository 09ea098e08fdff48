//! Redis-backed frontier store

use crate::config::StoreConfig;
use crate::frontier::store::KeyValueStore;
use crate::{CrawlerError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Production [`KeyValueStore`] over a Redis connection
///
/// The connection manager reconnects on its own; each operation is a single
/// round-trip and Redis guarantees the atomicity of single-key commands,
/// which is all the frontier's consistency model asks for.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connects to the store described by `config`
    ///
    /// Fails fast with [`CrawlerError::StoreUnavailable`] when the server
    /// cannot be reached, so the engine can refuse to start.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config.url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CrawlerError::StoreUnavailable(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CrawlerError::StoreUnavailable(e.to_string()))?;

        let store = Self { manager };
        store.ping().await?;
        tracing::info!(host = %config.host, port = config.port, "frontier store connected");
        Ok(store)
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let added: i64 = self.conn().sadd(key, member).await?;
        Ok(added == 1)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let removed: i64 = self.conn().srem(key, member).await?;
        Ok(removed == 1)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let contains: bool = self.conn().sismember(key, member).await?;
        Ok(contains)
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        let len: u64 = self.conn().scard(key).await?;
        Ok(len)
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let _: i64 = self.conn().zadd(key, member, score).await?;
        Ok(())
    }

    async fn zset_pop_min(&self, key: &str) -> Result<Option<(String, f64)>> {
        let mut popped: Vec<(String, f64)> = self.conn().zpopmin(key, 1).await?;
        Ok(popped.pop())
    }

    async fn zset_len(&self, key: &str) -> Result<u64> {
        let len: u64 = self.conn().zcard(key).await?;
        Ok(len)
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted: u64 = self.conn().del(keys).await?;
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        let pong: String = redis::cmd("PING").query_async(&mut self.conn()).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CrawlerError::StoreUnavailable(format!(
                "unexpected ping reply: {}",
                pong
            )))
        }
    }
}
