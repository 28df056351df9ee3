// 缓存模块
// 临时状态子系统：通用缓存层、会话注册表与一次性令牌

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型，方便其他模块使用
pub use models::{ActiveSession, CacheStats, SessionRecord, TokenPurpose, TokenRecord, TtlClass};
pub use operations::{KeyValueCache, SessionRegistry, SingleUseTokenIssuer};
pub use store::{KvStore, MemoryKvStore, RedisStore, SharedKvStore};
