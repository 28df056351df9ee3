use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::session::UserSessionEntity;

/// 会话缓存数据模型，按 token_hash 寻址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject_id: String,
    pub device_label: Option<String>,
    pub origin_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// 剩余有效秒数，已过期时为 0
    pub fn remaining_ttl_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

impl From<UserSessionEntity> for SessionRecord {
    fn from(entity: UserSessionEntity) -> Self {
        Self {
            subject_id: entity.subject_id,
            device_label: entity.device_label,
            origin_address: entity.origin_address,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
        }
    }
}

/// 用户设备列表中的一条活跃会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub token_hash: String,
    #[serde(flatten)]
    pub session: SessionRecord,
}

impl From<UserSessionEntity> for ActiveSession {
    fn from(entity: UserSessionEntity) -> Self {
        Self {
            token_hash: entity.token_hash.clone(),
            session: SessionRecord::from(entity),
        }
    }
}
