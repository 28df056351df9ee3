// 数据库模块
// 会话的持久化记录，作为审计与缓存未命中时的权威来源

pub mod memory;
pub mod models;
pub mod operations;

pub use memory::MemorySessionStore;
pub use models::session::UserSessionEntity;
pub use operations::session::{PgSessionStore, SessionStore, SharedSessionStore};
