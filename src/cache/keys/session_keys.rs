/// 会话缓存键前缀
const SESSION_PREFIX: &str = "session:";

/// 生成会话缓存键
pub fn session_key(token_hash: &str) -> String {
    format!("{}{}", SESSION_PREFIX, token_hash)
}
