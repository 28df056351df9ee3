use serde::{Deserialize, Serialize};

/// 缓存使用级别，具体秒数见 `CacheTtlConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    VeryShort,
    Default,
    Medium,
    Long,
    Extended,
}

/// 缓存状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub connected: bool,
    pub used_memory: Option<String>,
    pub key_count: u64,
}

impl CacheStats {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            used_memory: None,
            key_count: 0,
        }
    }
}
