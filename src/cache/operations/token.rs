use tracing::{debug, warn};

use crate::cache::keys::{token_key, token_lookup_key};
use crate::cache::models::{TokenPurpose, TokenRecord};
use crate::cache::store::SharedKvStore;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::{KvError, TokenError};
use crate::utils::generate_secret;

/// 一次性令牌签发器（找回密码、邮箱验证）
///
/// 令牌记录以原始秘密值为键保存在键值存储中，另有 (用户, 用途) -> 秘密值
/// 的反查键，签发时先作废旧令牌，保证每个 (用户, 用途) 至多一个有效令牌。
/// 并发重复签发时后写者胜出。
pub struct SingleUseTokenIssuer {
    kv: SharedKvStore,
    clock: SharedClock,
    password_reset_ttl_secs: u64,
    email_verification_ttl_secs: u64,
}

impl SingleUseTokenIssuer {
    pub fn new(
        kv: SharedKvStore,
        clock: SharedClock,
        password_reset_ttl_secs: u64,
        email_verification_ttl_secs: u64,
    ) -> Self {
        Self {
            kv,
            clock,
            password_reset_ttl_secs,
            email_verification_ttl_secs,
        }
    }

    pub fn from_config(kv: SharedKvStore, clock: SharedClock, config: &Config) -> Self {
        Self::new(
            kv,
            clock,
            config.password_reset_ttl_secs,
            config.email_verification_ttl_secs,
        )
    }

    pub fn ttl_for(&self, purpose: TokenPurpose) -> u64 {
        match purpose {
            TokenPurpose::PasswordReset => self.password_reset_ttl_secs,
            TokenPurpose::EmailVerification => self.email_verification_ttl_secs,
        }
    }

    /// 签发新令牌，返回秘密值
    ///
    /// 令牌记录未能写入时返回错误，调用方不应发出链接。
    pub async fn issue(&self, subject_id: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let lookup_key = token_lookup_key(subject_id, purpose);

        if let Some(previous) = self.kv.get(&lookup_key).await? {
            debug!(subject_id = %subject_id, purpose = %purpose, "Superseding previous token");
            self.kv.del(&[token_key(purpose, &previous)]).await?;
        }

        let secret = generate_secret();
        let record = TokenRecord {
            subject_id: subject_id.to_string(),
            purpose,
            created_at: self.clock.now(),
        };
        let json = serde_json::to_string(&record).map_err(KvError::from)?;
        let ttl = self.ttl_for(purpose);
        let key = token_key(purpose, &secret);

        self.kv.set_ex(&key, &json, ttl).await?;
        if let Err(e) = self.kv.set_ex(&lookup_key, &secret, ttl).await {
            // 没有反查键的令牌无法在重新签发时作废，回滚
            if let Err(rollback) = self.kv.del(&[key]).await {
                warn!(error = %rollback, "Failed to roll back token without lookup");
            }
            return Err(e.into());
        }

        Ok(secret)
    }

    /// 校验令牌，返回用户 ID
    ///
    /// 从未签发、已过期、已使用、用途不符均返回同一个错误，调用方无法区分。
    pub async fn validate(&self, secret: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let record = self
            .load(secret, purpose)
            .await
            .ok_or(TokenError::InvalidOrExpired)?;
        Ok(record.subject_id)
    }

    /// 校验并消费令牌
    ///
    /// 以删除令牌记录作为占用，同一秘密值并发兑换时只有一个调用成功。
    pub async fn redeem(&self, secret: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let record = self
            .load(secret, purpose)
            .await
            .ok_or(TokenError::InvalidOrExpired)?;

        let claimed = match self.kv.del(&[token_key(purpose, secret)]).await {
            Ok(removed) => removed > 0,
            Err(e) => {
                warn!(purpose = %purpose, error = %e, "Failed to consume token");
                return Err(TokenError::InvalidOrExpired);
            }
        };
        if !claimed {
            return Err(TokenError::InvalidOrExpired);
        }

        self.remove_lookup(&record.subject_id, purpose, secret).await;
        Ok(record.subject_id)
    }

    /// 作废令牌，令牌不存在时无操作
    pub async fn invalidate(&self, secret: &str, purpose: TokenPurpose) {
        let record = self.load(secret, purpose).await;

        if let Err(e) = self.kv.del(&[token_key(purpose, secret)]).await {
            warn!(purpose = %purpose, error = %e, "Failed to delete token");
        }
        if let Some(record) = record {
            self.remove_lookup(&record.subject_id, purpose, secret).await;
        }
    }

    async fn load(&self, secret: &str, purpose: TokenPurpose) -> Option<TokenRecord> {
        let raw = match self.kv.get(&token_key(purpose, secret)).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(purpose = %purpose, error = %e, "Token lookup failed");
                return None;
            }
        };

        let record: TokenRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(purpose = %purpose, error = %e, "Stored token could not be deserialized");
                return None;
            }
        };

        (record.purpose == purpose).then_some(record)
    }

    // 反查键已指向更新的令牌时保留
    async fn remove_lookup(&self, subject_id: &str, purpose: TokenPurpose, secret: &str) {
        let lookup_key = token_lookup_key(subject_id, purpose);
        match self.kv.get(&lookup_key).await {
            Ok(Some(current)) if current == secret => {
                if let Err(e) = self.kv.del(&[lookup_key]).await {
                    warn!(purpose = %purpose, error = %e, "Failed to delete token lookup");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(purpose = %purpose, error = %e, "Token lookup read failed"),
        }
    }
}
