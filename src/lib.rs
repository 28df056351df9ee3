use std::sync::Arc;

use cache::{KeyValueCache, SessionRegistry, SharedKvStore, SingleUseTokenIssuer};
use clock::SharedClock;
use config::Config;
use database::SharedSessionStore;

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: Arc<KeyValueCache>,
    pub sessions: Arc<SessionRegistry>,
    pub tokens: Arc<SingleUseTokenIssuer>,
}

impl AppState {
    /// 以注入的存储和时钟构造三个组件
    pub fn new(config: Config, kv: SharedKvStore, db: SharedSessionStore, clock: SharedClock) -> Self {
        let cache = KeyValueCache::from_config(Arc::clone(&kv), &config);
        let sessions =
            SessionRegistry::from_config(Arc::clone(&kv), db, Arc::clone(&clock), &config);
        let tokens = SingleUseTokenIssuer::from_config(kv, clock, &config);

        Self {
            config,
            cache: Arc::new(cache),
            sessions: Arc::new(sessions),
            tokens: Arc::new(tokens),
        }
    }
}
