use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 用户会话数据库实体
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSessionEntity {
    pub id: Uuid,
    /// SHA-256(secret)，唯一
    pub token_hash: String,
    pub subject_id: String,
    pub device_label: Option<String>,
    pub origin_address: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
