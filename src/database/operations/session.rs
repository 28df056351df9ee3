// 会话存储库
// 包含会话相关的数据库操作

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::session::UserSessionEntity;
use crate::error::DatabaseResult;

/// 会话持久化存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &UserSessionEntity) -> DatabaseResult<()>;

    /// 按 token_hash 查找尚未过期的会话
    async fn find_first_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<UserSessionEntity>>;

    /// 用户尚未过期的全部会话，按创建时间倒序
    async fn find_many_active(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<UserSessionEntity>>;

    /// 用户全部会话的 token_hash（含已过期）
    async fn find_hashes_by_subject(&self, subject_id: &str) -> DatabaseResult<Vec<String>>;

    async fn delete_by_hash(&self, token_hash: &str) -> DatabaseResult<u64>;

    async fn delete_many(&self, token_hashes: &[String]) -> DatabaseResult<u64>;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

/// 基于 Postgres 的会话存储库
pub struct PgSessionStore {
    db: Arc<PgPool>,
}

impl PgSessionStore {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &UserSessionEntity) -> DatabaseResult<()> {
        // 同一秘密值重复登录时覆盖旧记录
        sqlx::query(
            r#"
            INSERT INTO user_sessions
                (id, token_hash, subject_id, device_label, origin_address, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (token_hash) DO UPDATE SET
                subject_id = EXCLUDED.subject_id,
                device_label = EXCLUDED.device_label,
                origin_address = EXCLUDED.origin_address,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.id)
        .bind(&session.token_hash)
        .bind(&session.subject_id)
        .bind(&session.device_label)
        .bind(&session.origin_address)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&*self.db)
        .await?;

        Ok(())
    }

    async fn find_first_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<UserSessionEntity>> {
        let session = sqlx::query_as::<_, UserSessionEntity>(
            r#"
            SELECT id, token_hash, subject_id, device_label, origin_address, created_at, expires_at
            FROM user_sessions
            WHERE token_hash = $1 AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&*self.db)
        .await?;

        Ok(session)
    }

    async fn find_many_active(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<UserSessionEntity>> {
        let sessions = sqlx::query_as::<_, UserSessionEntity>(
            r#"
            SELECT id, token_hash, subject_id, device_label, origin_address, created_at, expires_at
            FROM user_sessions
            WHERE subject_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(subject_id)
        .bind(now)
        .fetch_all(&*self.db)
        .await?;

        Ok(sessions)
    }

    async fn find_hashes_by_subject(&self, subject_id: &str) -> DatabaseResult<Vec<String>> {
        let hashes = sqlx::query_scalar::<_, String>(
            "SELECT token_hash FROM user_sessions WHERE subject_id = $1",
        )
        .bind(subject_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(hashes)
    }

    async fn delete_by_hash(&self, token_hash: &str) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_many(&self, token_hashes: &[String]) -> DatabaseResult<u64> {
        if token_hashes.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = ANY($1)")
            .bind(token_hashes)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
