//! 会话注册表
//!
//! 会话按 `SHA-256(secret)` 寻址。持久层是权威来源，Redis 中只保存
//! 持久层记录的副本以加速校验。过期在读取时惰性判定，没有后台清理。
//! 存储故障一律记录日志后降级为“需要重新登录”，不会向调用方抛错。

use chrono::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::keys::session_key;
use crate::cache::models::{ActiveSession, SessionRecord};
use crate::cache::store::SharedKvStore;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::database::models::session::UserSessionEntity;
use crate::database::operations::session::SharedSessionStore;
use crate::utils::hash_secret;

pub struct SessionRegistry {
    kv: SharedKvStore,
    db: SharedSessionStore,
    clock: SharedClock,
    session_ttl_secs: u64,
}

impl SessionRegistry {
    pub fn new(
        kv: SharedKvStore,
        db: SharedSessionStore,
        clock: SharedClock,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            kv,
            db,
            clock,
            session_ttl_secs,
        }
    }

    pub fn from_config(
        kv: SharedKvStore,
        db: SharedSessionStore,
        clock: SharedClock,
        config: &Config,
    ) -> Self {
        Self::new(kv, db, clock, config.session_ttl().as_secs())
    }

    /// 创建会话，返回 token_hash
    ///
    /// 先写持久层；持久层写入失败时不写缓存（缓存只能是持久记录的副本），
    /// 调用方拿到的 hash 随后校验不通过，用户需重新登录。
    pub async fn create_session(
        &self,
        subject_id: &str,
        secret: &str,
        device_label: Option<&str>,
        origin_address: &str,
    ) -> String {
        let token_hash = hash_secret(secret);
        let now = self.clock.now();
        let Some(expires_at) = i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
        else {
            warn!(subject_id = %subject_id, ttl = self.session_ttl_secs, "Session TTL out of range");
            return token_hash;
        };
        let entity = UserSessionEntity {
            id: Uuid::new_v4(),
            token_hash: token_hash.clone(),
            subject_id: subject_id.to_string(),
            device_label: device_label.map(str::to_string),
            origin_address: origin_address.to_string(),
            created_at: now,
            expires_at,
        };

        if let Err(e) = self.db.create(&entity).await {
            warn!(subject_id = %subject_id, error = %e, "Failed to persist session");
            return token_hash;
        }

        self.cache_record(&token_hash, &SessionRecord::from(entity), self.session_ttl_secs)
            .await;
        debug!(subject_id = %subject_id, "Session created");
        token_hash
    }

    /// 校验会话；缓存未命中时回落到持久层并回填缓存
    pub async fn validate_session(&self, secret: &str) -> Option<SessionRecord> {
        let token_hash = hash_secret(secret);
        let now = self.clock.now();

        if let Some(record) = self.cached_record(&token_hash).await {
            if !record.is_expired(now) {
                return Some(record);
            }
            debug!("Cached session expired, invalidating");
            self.invalidate_session_by_hash(&token_hash).await;
            return None;
        }

        let entity = match self.db.find_first_active(&token_hash, now).await {
            Ok(Some(entity)) => entity,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Session lookup in database failed");
                return None;
            }
        };

        let record = SessionRecord::from(entity);
        let remaining = record.remaining_ttl_secs(now);
        if remaining > 0 {
            self.cache_record(&token_hash, &record, remaining).await;
        }
        Some(record)
    }

    pub async fn invalidate_session(&self, secret: &str) {
        self.invalidate_session_by_hash(&hash_secret(secret)).await;
    }

    pub async fn invalidate_session_by_hash(&self, token_hash: &str) {
        if let Err(e) = self.kv.del(&[session_key(token_hash)]).await {
            warn!(error = %e, "Failed to remove cached session");
        }
        if let Err(e) = self.db.delete_by_hash(token_hash).await {
            warn!(error = %e, "Failed to delete session from database");
        }
    }

    /// 注销用户的全部会话，返回删除的持久记录数
    ///
    /// 缓存不可用时不删除持久记录并返回 0，调用方可以重试。
    pub async fn invalidate_all_user_sessions(&self, subject_id: &str) -> u64 {
        let hashes = match self.db.find_hashes_by_subject(subject_id).await {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "Failed to list sessions for logout-all");
                return 0;
            }
        };
        if hashes.is_empty() {
            return 0;
        }

        let keys: Vec<String> = hashes.iter().map(|h| session_key(h)).collect();
        // 缓存副本删除失败时保留持久记录，重试时仍能找到这些 hash
        if let Err(e) = self.kv.del(&keys).await {
            warn!(subject_id = %subject_id, error = %e, "Failed to remove cached sessions");
            return 0;
        }

        match self.db.delete_many(&hashes).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "Failed to delete sessions from database");
                0
            }
        }
    }

    /// 用户当前有效的会话，按创建时间倒序，只读持久层
    pub async fn get_user_active_sessions(&self, subject_id: &str) -> Vec<ActiveSession> {
        let now = self.clock.now();
        match self.db.find_many_active(subject_id, now).await {
            Ok(sessions) => sessions.into_iter().map(ActiveSession::from).collect(),
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "Failed to list active sessions");
                Vec::new()
            }
        }
    }

    async fn cached_record(&self, token_hash: &str) -> Option<SessionRecord> {
        let raw = match self.kv.get(&session_key(token_hash)).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Session cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Cached session could not be deserialized");
                None
            }
        }
    }

    async fn cache_record(&self, token_hash: &str, record: &SessionRecord, ttl_secs: u64) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Session could not be serialized");
                return;
            }
        };
        if let Err(e) = self.kv.set_ex(&session_key(token_hash), &json, ttl_secs).await {
            warn!(error = %e, "Failed to cache session");
        }
    }
}
