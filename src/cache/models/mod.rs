/// 缓存数据模型
pub mod session;
pub mod stats;
pub mod token;

pub use session::{ActiveSession, SessionRecord};
pub use stats::{CacheStats, TtlClass};
pub use token::{TokenPurpose, TokenRecord};
