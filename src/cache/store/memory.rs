//! 进程内键值存储
//!
//! 用于测试以及未配置 Redis 时的单进程部署，不具备持久性。
//! 过期时间由注入的 `Clock` 判定，过期键在下一次访问时被惰性清除。
//!
//! SCAN 的游标是键首次写入时分配的递增序号，因此扫描期间删除键
//! 不会导致其余键被跳过；扫描开始后新写入的键可能出现也可能不出现。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{KvStore, TTL_MISSING, TTL_PERSISTENT};
use crate::clock::SharedClock;
use crate::error::{KvError, KvResult};

fn expires_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
    seq: u64,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn live(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn upsert(&mut self, key: &str, value: String, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        if let Some(entry) = self.live(key, now) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }
        self.next_seq += 1;
        let seq = self.next_seq;
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at,
                seq,
            },
        );
    }
}

pub struct MemoryKvStore {
    inner: RwLock<Inner>,
    clock: SharedClock,
}

impl MemoryKvStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            clock,
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        Ok(inner.live(key, now).map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        if ttl_secs == 0 {
            return Err(KvError::Unavailable(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }
        let now = self.clock.now();
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(|secs| expires_after(now, secs))
            .ok_or_else(|| {
                KvError::Unavailable("invalid expire time in 'setex' command".to_string())
            })?;
        self.inner
            .write()
            .await
            .upsert(key, value.to_string(), Some(expires_at), now);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for key in keys {
            if inner.live(key, now).is_some() {
                inner.entries.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let now = self.clock.now();
        Ok(self.inner.write().await.live(key, now).is_some())
    }

    async fn ttl(&self, key: &str) -> KvResult<i64> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        let ttl = match inner.live(key, now) {
            None => TTL_MISSING,
            Some(Entry {
                expires_at: None, ..
            }) => TTL_PERSISTENT,
            // 与 Redis 一致，按毫秒四舍五入到秒
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => ((*at - now).num_milliseconds() + 500) / 1000,
        };
        Ok(ttl)
    }

    async fn expire(&self, key: &str, secs: i64) -> KvResult<bool> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        if inner.live(key, now).is_none() {
            return Ok(false);
        }
        if secs <= 0 {
            inner.entries.remove(key);
            return Ok(true);
        }
        let expires_at = expires_after(now, secs).ok_or_else(|| {
            KvError::Unavailable("invalid expire time in 'expire' command".to_string())
        })?;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.expires_at = Some(expires_at);
        }
        Ok(true)
    }

    async fn incr_by(&self, key: &str, amount: i64) -> KvResult<i64> {
        let now = self.clock.now();
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.live(key, now) {
            let current: i64 = entry.value.parse().map_err(|_| KvError::NotAnInteger {
                key: key.to_string(),
            })?;
            let next = current.checked_add(amount).ok_or_else(|| KvError::Overflow {
                key: key.to_string(),
            })?;
            entry.value = next.to_string();
            return Ok(next);
        }
        inner.upsert(key, amount.to_string(), None, now);
        Ok(amount)
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> KvResult<(u64, Vec<String>)> {
        let now = self.clock.now();
        let inner = self.inner.read().await;

        let mut window: Vec<(u64, &String)> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.seq > cursor && e.is_live(now))
            .map(|(k, e)| (e.seq, k))
            .collect();
        window.sort_unstable_by_key(|(seq, _)| *seq);

        let more = window.len() > count.max(1);
        window.truncate(count.max(1));

        let next = match (more, window.last()) {
            (true, Some((seq, _))) => *seq,
            _ => 0,
        };
        let keys = window
            .into_iter()
            .filter(|(_, k)| glob_match(pattern, k))
            .map(|(_, k)| k.clone())
            .collect();
        Ok((next, keys))
    }

    async fn info(&self, _section: &str) -> KvResult<String> {
        let now = self.clock.now();
        let inner = self.inner.read().await;
        let used: usize = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, e)| k.len() + e.value.len())
            .sum();
        Ok(format!(
            "# Memory\r\nused_memory:{}\r\nused_memory_human:{}\r\n",
            used,
            human_bytes(used)
        ))
    }

    async fn dbsize(&self) -> KvResult<u64> {
        let now = self.clock.now();
        let inner = self.inner.read().await;
        Ok(inner.entries.values().filter(|e| e.is_live(now)).count() as u64)
    }
}

fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{:.2}{}", value, unit)
}

/// Redis 风格的 glob 匹配，支持 `*`、`?` 和 `\` 转义
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            Some('?') => {
                pi += 1;
                ti += 1;
                continue;
            }
            Some('\\') if p.get(pi + 1) == Some(&t[ti]) => {
                pi += 2;
                ti += 1;
                continue;
            }
            Some(c) if *c != '\\' && *c == t[ti] => {
                pi += 1;
                ti += 1;
                continue;
            }
            _ => {}
        }
        match star {
            Some((sp, st)) => {
                pi = sp + 1;
                ti = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn store() -> (Arc<ManualClock>, MemoryKvStore) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemoryKvStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match("app:*", "app:user:1"));
        assert!(glob_match("*", ""));
        assert!(glob_match("user:?", "user:1"));
        assert!(!glob_match("user:?", "user:12"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("lit\\*", "lit*"));
        assert!(!glob_match("lit\\*", "literal"));
        assert!(!glob_match("app:*", "other:app:1"));
    }

    #[tokio::test]
    async fn entries_expire_with_the_clock() {
        let (clock, store) = store();
        store.set_ex("k", "v", 10).await.expect("set");
        assert_eq!(store.ttl("k").await.expect("ttl"), 10);

        clock.advance(Duration::seconds(9));
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("v"));

        clock.advance(Duration::seconds(1));
        assert_eq!(store.get("k").await.expect("get"), None);
        assert_eq!(store.ttl("k").await.expect("ttl"), TTL_MISSING);
    }

    #[tokio::test]
    async fn incr_creates_persistent_counter_and_keeps_ttl() {
        let (_clock, store) = store();
        assert_eq!(store.incr_by("c", 3).await.expect("incr"), 3);
        assert_eq!(store.ttl("c").await.expect("ttl"), TTL_PERSISTENT);

        assert!(store.expire("c", 60).await.expect("expire"));
        assert_eq!(store.incr_by("c", 2).await.expect("incr"), 5);
        assert_eq!(store.ttl("c").await.expect("ttl"), 60);

        store.set_ex("text", "abc", 60).await.expect("set");
        assert!(matches!(
            store.incr_by("text", 1).await,
            Err(KvError::NotAnInteger { .. })
        ));
    }

    #[tokio::test]
    async fn out_of_range_values_are_errors() {
        let (_clock, store) = store();
        store.set_ex("max", &i64::MAX.to_string(), 60).await.expect("set");
        assert!(matches!(
            store.incr_by("max", 1).await,
            Err(KvError::Overflow { .. })
        ));
        assert_eq!(store.get("max").await.expect("get"), Some(i64::MAX.to_string()));

        assert!(store.set_ex("huge", "v", u64::MAX).await.is_err());
        assert!(store.set_ex("huge", "v", i64::MAX as u64).await.is_err());
        assert!(store.expire("max", i64::MAX).await.is_err());
        assert_eq!(store.ttl("max").await.expect("ttl"), 60);
    }

    #[tokio::test]
    async fn scan_survives_deletes_between_batches() {
        let (_clock, store) = store();
        for i in 0..25 {
            store
                .set_ex(&format!("k:{}", i), "v", 60)
                .await
                .expect("set");
        }

        let mut cursor = 0;
        let mut seen = 0;
        loop {
            let (next, keys) = store.scan(cursor, "k:*", 10).await.expect("scan");
            seen += keys.len();
            store.del(&keys).await.expect("del");
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen, 25);
        assert_eq!(store.dbsize().await.expect("dbsize"), 0);
    }

    #[tokio::test]
    async fn info_reports_human_memory() {
        let (_clock, store) = store();
        store.set_ex("key", "value", 60).await.expect("set");
        let info = store.info("memory").await.expect("info");
        assert!(info.contains("used_memory_human:8B"));
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let (_clock, store) = store();
        assert!(store.set_ex("k", "v", 0).await.is_err());
    }
}
