use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, aio::MultiplexedConnection};

use super::KvStore;
use crate::error::KvResult;

/// 基于 Redis 的键值存储
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
}

impl RedisStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    pub fn open(url: &str) -> KvResult<Self> {
        let client = RedisClient::open(url)?;
        Ok(Self::new(Arc::new(client)))
    }

    async fn conn(&self) -> KvResult<MultiplexedConnection> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        // DEL 不接受空参数
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.conn().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> KvResult<i64> {
        let mut conn = self.conn().await?;
        let ttl: i64 = conn.ttl(key).await?;
        Ok(ttl)
    }

    async fn expire(&self, key: &str, secs: i64) -> KvResult<bool> {
        let mut conn = self.conn().await?;
        let applied: bool = conn.expire(key, secs).await?;
        Ok(applied)
    }

    async fn incr_by(&self, key: &str, amount: i64) -> KvResult<i64> {
        let mut conn = self.conn().await?;
        let value: i64 = conn.incr(key, amount).await?;
        Ok(value)
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> KvResult<(u64, Vec<String>)> {
        let mut conn = self.conn().await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }

    async fn info(&self, section: &str) -> KvResult<String> {
        let mut conn = self.conn().await?;
        let info: String = redis::cmd("INFO").arg(section).query_async(&mut conn).await?;
        Ok(info)
    }

    async fn dbsize(&self) -> KvResult<u64> {
        let mut conn = self.conn().await?;
        let size: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(size)
    }
}
