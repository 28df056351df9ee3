use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{KvStore, MemoryKvStore};
use crate::clock::SharedClock;
use crate::error::{KvError, KvResult};

/// 所有命令都失败的存储，用于验证降级路径
pub struct FailingKvStore;

fn down<T>() -> KvResult<T> {
    Err(KvError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> KvResult<Option<String>> {
        down()
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> KvResult<()> {
        down()
    }

    async fn del(&self, _keys: &[String]) -> KvResult<u64> {
        down()
    }

    async fn exists(&self, _key: &str) -> KvResult<bool> {
        down()
    }

    async fn ttl(&self, _key: &str) -> KvResult<i64> {
        down()
    }

    async fn expire(&self, _key: &str, _secs: i64) -> KvResult<bool> {
        down()
    }

    async fn incr_by(&self, _key: &str, _amount: i64) -> KvResult<i64> {
        down()
    }

    async fn scan(
        &self,
        _cursor: u64,
        _pattern: &str,
        _count: usize,
    ) -> KvResult<(u64, Vec<String>)> {
        down()
    }

    async fn info(&self, _section: &str) -> KvResult<String> {
        down()
    }

    async fn dbsize(&self) -> KvResult<u64> {
        down()
    }
}

/// 基于内存存储、可按命令注入故障的存储
pub struct FlakyKvStore {
    inner: MemoryKvStore,
    fail_del: AtomicBool,
    fail_expire: AtomicBool,
}

impl FlakyKvStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: MemoryKvStore::new(clock),
            fail_del: AtomicBool::new(false),
            fail_expire: AtomicBool::new(false),
        }
    }

    pub fn fail_del(&self, fail: bool) {
        self.fail_del.store(fail, Ordering::SeqCst);
    }

    pub fn fail_expire(&self, fail: bool) {
        self.fail_expire.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for FlakyKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        self.inner.set_ex(key, value, ttl_secs).await
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        if self.fail_del.load(Ordering::SeqCst) {
            return down();
        }
        self.inner.del(keys).await
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> KvResult<i64> {
        self.inner.ttl(key).await
    }

    async fn expire(&self, key: &str, secs: i64) -> KvResult<bool> {
        if self.fail_expire.load(Ordering::SeqCst) {
            return down();
        }
        self.inner.expire(key, secs).await
    }

    async fn incr_by(&self, key: &str, amount: i64) -> KvResult<i64> {
        self.inner.incr_by(key, amount).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> KvResult<(u64, Vec<String>)> {
        self.inner.scan(cursor, pattern, count).await
    }

    async fn info(&self, section: &str) -> KvResult<String> {
        self.inner.info(section).await
    }

    async fn dbsize(&self) -> KvResult<u64> {
        self.inner.dbsize().await
    }
}
