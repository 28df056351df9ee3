//! 键值存储抽象
//!
//! 缓存层、会话注册表和令牌签发器只依赖这里的最小命令集
//! （GET / SETEX / DEL / EXISTS / TTL / EXPIRE / INCRBY / SCAN / INFO / DBSIZE），
//! 具体实现由调用方在构造时注入。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::KvResult;

pub mod memory;
pub mod redis_store;
#[cfg(test)]
pub(crate) mod testing;

pub use self::memory::MemoryKvStore;
pub use self::redis_store::RedisStore;

/// TTL 查询结果：键不存在
pub const TTL_MISSING: i64 = -2;
/// TTL 查询结果：键存在但没有过期时间
pub const TTL_PERSISTENT: i64 = -1;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()>;

    /// 返回实际删除的键数量
    async fn del(&self, keys: &[String]) -> KvResult<u64>;

    async fn exists(&self, key: &str) -> KvResult<bool>;

    /// 剩余秒数；`-1` 无过期时间，`-2` 不存在
    async fn ttl(&self, key: &str) -> KvResult<i64>;

    /// 键不存在时返回 false
    async fn expire(&self, key: &str, secs: i64) -> KvResult<bool>;

    async fn incr_by(&self, key: &str, amount: i64) -> KvResult<i64>;

    /// 游标扫描，返回的下一个游标为 0 表示扫描结束
    async fn scan(&self, cursor: u64, pattern: &str, count: usize)
    -> KvResult<(u64, Vec<String>)>;

    async fn info(&self, section: &str) -> KvResult<String>;

    async fn dbsize(&self) -> KvResult<u64>;
}

pub type SharedKvStore = Arc<dyn KvStore>;
