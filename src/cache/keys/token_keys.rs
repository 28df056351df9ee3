use crate::cache::models::TokenPurpose;

/// 令牌缓存键前缀
const TOKEN_PREFIX: &str = "token:";

/// 令牌反查键前缀
const TOKEN_USER_PREFIX: &str = "token:user:";

/// 生成令牌记录键
pub fn token_key(purpose: TokenPurpose, secret: &str) -> String {
    format!("{}{}:{}", TOKEN_PREFIX, purpose, secret)
}

/// 生成 (用户, 用途) -> 秘密值 的反查键
pub fn token_lookup_key(subject_id: &str, purpose: TokenPurpose) -> String {
    format!("{}{}:{}", TOKEN_USER_PREFIX, subject_id, purpose)
}
