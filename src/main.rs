use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use ephemeral_state::{
    AppState,
    cache::{MemoryKvStore, RedisStore, SharedKvStore},
    clock::{SharedClock, SystemClock},
    config::Config,
    database::{MemorySessionStore, PgSessionStore, SharedSessionStore},
    router::build_router,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env();
    let clock: SharedClock = Arc::new(SystemClock);

    // 设置 Redis 客户端，未配置时使用进程内存储
    let kv: SharedKvStore = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::open(url).expect("Failed to create Redis client")),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process key-value store");
            Arc::new(MemoryKvStore::new(Arc::clone(&clock)))
        }
    };

    // 设置数据库连接池
    let db: SharedSessionStore = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("Failed to connect to Postgres");
            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");
            Arc::new(PgSessionStore::new(Arc::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    let state = AppState::new(config.clone(), kv, db, clock);
    let router = build_router(state);

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
