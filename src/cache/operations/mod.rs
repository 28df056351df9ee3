/// 缓存操作
/// 通用缓存层、会话注册表、一次性令牌签发器，三者互不依赖

pub mod kv;
pub mod session;
pub mod token;

pub use kv::KeyValueCache;
pub use session::SessionRegistry;
pub use token::SingleUseTokenIssuer;
