//! 通用缓存层
//!
//! 对原始键值存储的 get/set/delete/exists/ttl/increment/模式失效 封装，
//! 以及 cache-aside 的 `get_or_compute`。所有失败路径记录日志后返回
//! 安全默认值（`None`/`false`/`0`），缓存不可用只影响性能，不影响可用性。

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use crate::cache::keys::{DEFAULT_PREFIX, prefixed_key};
use crate::cache::models::{CacheStats, TtlClass};
use crate::cache::store::{SharedKvStore, TTL_MISSING, TTL_PERSISTENT};
use crate::config::{CacheTtlConfig, Config};

/// 模式失效时每批扫描的键数
pub const SCAN_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct KeyValueCache {
    store: SharedKvStore,
    prefix: String,
    ttl: CacheTtlConfig,
}

impl KeyValueCache {
    pub fn new(store: SharedKvStore, prefix: impl Into<String>, ttl: CacheTtlConfig) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn from_config(store: SharedKvStore, config: &Config) -> Self {
        Self::new(store, config.cache_prefix.clone(), config.cache_ttl)
    }

    /// 使用默认命名空间和默认 TTL
    pub fn with_defaults(store: SharedKvStore) -> Self {
        Self::new(store, DEFAULT_PREFIX, CacheTtlConfig::default())
    }

    /// 返回共享同一存储、使用指定命名空间的句柄
    pub fn scoped(&self, prefix: impl Into<String>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: prefix.into(),
            ttl: self.ttl,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl_for(&self, class: TtlClass) -> u64 {
        self.ttl.seconds(class)
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.key(key);
        let raw = match self.store.get(&full_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache get failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache value could not be deserialized");
                None
            }
        }
    }

    /// 写入缓存，`ttl_secs` 为空时使用默认级别
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let full_key = self.key(key);
        let ttl = ttl_secs.unwrap_or(self.ttl.default);
        if ttl == 0 {
            warn!(key = %full_key, "Refusing to cache a value without a positive TTL");
            return false;
        }

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache value could not be serialized");
                return false;
            }
        };

        match self.store.set_ex(&full_key, &json, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// cache-aside 读取
    ///
    /// 命中直接返回；未命中时执行 `compute` 并立即返回结果，回写在后台任务中
    /// 完成，回写失败只记录日志。并发未命中时 `compute` 可能被执行多次。
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, compute: F, ttl_secs: Option<u64>) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key = %key, "Cache hit");
            return hit;
        }

        debug!(key = %key, "Cache miss, computing");
        let value = compute().await;
        self.spawn_write_back(key, &value, ttl_secs);
        value
    }

    /// 与 `get_or_compute` 相同，但 `compute` 可能失败；失败结果不会被缓存
    pub async fn get_or_try_compute<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl_secs: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        let value = compute().await?;
        self.spawn_write_back(key, &value, ttl_secs);
        Ok(value)
    }

    fn spawn_write_back<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) {
        let full_key = self.key(key);
        let ttl = ttl_secs.unwrap_or(self.ttl.default);
        if ttl == 0 {
            warn!(key = %full_key, "Skipping write-back without a positive TTL");
            return;
        }

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Computed value could not be serialized");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.set_ex(&full_key, &json, ttl).await {
                error!(key = %full_key, error = %e, "Cache write-back failed");
            }
        });
    }

    /// 删除单个键，键不存在不算失败
    pub async fn delete(&self, key: &str) -> bool {
        let full_key = self.key(key);
        match self.store.del(std::slice::from_ref(&full_key)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// 批量删除，返回实际删除数量
    pub async fn delete_many(&self, keys: &[&str]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        match self.store.del(&full_keys).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(count = full_keys.len(), error = %e, "Cache bulk delete failed");
                0
            }
        }
    }

    /// 按 glob 模式批量失效
    ///
    /// 以游标分批扫描直到游标归零，非原子：扫描期间并发写入的键可能漏删。
    /// 中途出错时返回已删除的数量。
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let full_pattern = self.key(pattern);
        let mut cursor = 0;
        let mut removed = 0;

        loop {
            let (next, keys) = match self
                .store
                .scan(cursor, &full_pattern, SCAN_BATCH_SIZE)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(pattern = %full_pattern, error = %e, "Cache scan failed");
                    return removed;
                }
            };

            if !keys.is_empty() {
                match self.store.del(&keys).await {
                    Ok(n) => removed += n,
                    Err(e) => {
                        warn!(pattern = %full_pattern, error = %e, "Cache pattern delete failed");
                        return removed;
                    }
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %full_pattern, removed, "Invalidated cache pattern");
        removed
    }

    pub async fn exists(&self, key: &str) -> bool {
        let full_key = self.key(key);
        self.store.exists(&full_key).await.unwrap_or_else(|e| {
            warn!(key = %full_key, error = %e, "Cache exists failed");
            false
        })
    }

    /// 剩余秒数；`-1` 无过期时间，`-2` 不存在（存储出错时同样返回 `-2`）
    pub async fn get_ttl(&self, key: &str) -> i64 {
        let full_key = self.key(key);
        self.store.ttl(&full_key).await.unwrap_or_else(|e| {
            warn!(key = %full_key, error = %e, "Cache ttl failed");
            TTL_MISSING
        })
    }

    /// 在当前剩余时间上延长过期时间；键不存在或没有过期时间时返回 false
    pub async fn extend_ttl(&self, key: &str, extra_secs: u64) -> bool {
        let full_key = self.key(key);
        let current = match self.store.ttl(&full_key).await {
            Ok(ttl) if ttl > 0 => ttl,
            Ok(_) => return false,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache ttl failed");
                return false;
            }
        };

        let Some(extended) = i64::try_from(extra_secs)
            .ok()
            .and_then(|extra| current.checked_add(extra))
        else {
            warn!(key = %full_key, extra_secs, "Cache ttl extension out of range");
            return false;
        };

        match self.store.expire(&full_key, extended).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache expire failed");
                false
            }
        }
    }

    /// 原子自增
    ///
    /// 给定 `ttl_secs` 时只在键刚被创建（自增结果等于 `amount`）时设置过期时间，
    /// 重复调用不会让窗口滑动。之前的 EXPIRE 失败导致键没有过期时间时补设。
    pub async fn increment(&self, key: &str, amount: i64, ttl_secs: Option<u64>) -> Option<i64> {
        let full_key = self.key(key);
        let value = self.incr(&full_key, amount).await?;
        let Some(ttl) = ttl_secs else {
            return Some(value);
        };

        if value == amount || self.missing_expiry(&full_key).await {
            self.apply_ttl(&full_key, ttl).await;
        }
        Some(value)
    }

    async fn missing_expiry(&self, full_key: &str) -> bool {
        match self.store.ttl(full_key).await {
            Ok(ttl) => ttl == TTL_PERSISTENT,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache ttl failed");
                false
            }
        }
    }

    /// 原子自增，每次给定 `ttl_secs` 都重置过期时间（滑动窗口）
    pub async fn increment_sliding(
        &self,
        key: &str,
        amount: i64,
        ttl_secs: Option<u64>,
    ) -> Option<i64> {
        let full_key = self.key(key);
        let value = self.incr(&full_key, amount).await?;
        if let Some(ttl) = ttl_secs {
            self.apply_ttl(&full_key, ttl).await;
        }
        Some(value)
    }

    async fn incr(&self, full_key: &str, amount: i64) -> Option<i64> {
        match self.store.incr_by(full_key, amount).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache increment failed");
                None
            }
        }
    }

    async fn apply_ttl(&self, full_key: &str, ttl: u64) {
        if let Err(e) = self.store.expire(full_key, ttl as i64).await {
            warn!(key = %full_key, error = %e, "Cache expire failed");
        }
    }

    /// 删除当前命名空间下的所有键，仅用于维护
    pub async fn flush_all(&self) -> u64 {
        warn!(prefix = %self.prefix, "Flushing all cache keys");
        self.invalidate_pattern("*").await
    }

    pub async fn get_stats(&self) -> CacheStats {
        let info = match self.store.info("memory").await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Cache info failed");
                return CacheStats::disconnected();
            }
        };

        let key_count = self.store.dbsize().await.unwrap_or_else(|e| {
            warn!(error = %e, "Cache dbsize failed");
            0
        });

        CacheStats {
            connected: true,
            used_memory: parse_used_memory(&info),
            key_count,
        }
    }
}

/// 从 INFO 输出中取出 `used_memory_human` 的值
pub fn parse_used_memory(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("used_memory_human:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
