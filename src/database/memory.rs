//! 进程内会话存储
//!
//! 用于测试以及未配置 Postgres 的单进程部署。记录读取次数，
//! 便于断言某次请求是否落到了持久层。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::models::session::UserSessionEntity;
use crate::database::operations::session::SessionStore;
use crate::error::{DatabaseError, DatabaseResult};

#[derive(Default)]
pub struct MemorySessionStore {
    rows: RwLock<HashMap<String, UserSessionEntity>>,
    reads: AtomicU64,
    offline: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读操作累计次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// 模拟数据库不可用
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_online(&self) -> DatabaseResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn record_read(&self) -> DatabaseResult<()> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &UserSessionEntity) -> DatabaseResult<()> {
        self.check_online()?;
        self.rows
            .write()
            .await
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_first_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<UserSessionEntity>> {
        self.record_read()?;
        Ok(self
            .rows
            .read()
            .await
            .get(token_hash)
            .filter(|s| s.expires_at > now)
            .cloned())
    }

    async fn find_many_active(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<UserSessionEntity>> {
        self.record_read()?;
        let mut sessions: Vec<UserSessionEntity> = self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.subject_id == subject_id && s.expires_at > now)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn find_hashes_by_subject(&self, subject_id: &str) -> DatabaseResult<Vec<String>> {
        self.record_read()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.subject_id == subject_id)
            .map(|s| s.token_hash.clone())
            .collect())
    }

    async fn delete_by_hash(&self, token_hash: &str) -> DatabaseResult<u64> {
        self.check_online()?;
        Ok(self.rows.write().await.remove(token_hash).map_or(0, |_| 1))
    }

    async fn delete_many(&self, token_hashes: &[String]) -> DatabaseResult<u64> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        Ok(token_hashes
            .iter()
            .filter(|hash| rows.remove(hash.as_str()).is_some())
            .count() as u64)
    }
}
