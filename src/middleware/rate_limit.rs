use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::KeyValueCache,
    config::Config,
    utils::{error_codes, error_to_api_response},
};

/// 限流计数器所在的缓存命名空间
const RATE_LIMIT_PREFIX: &str = "rate_limit";

/// 基于固定窗口计数的 IP 限流
#[derive(Clone)]
pub struct RateLimiter {
    cache: KeyValueCache,
    window_secs: u64,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(cache: &KeyValueCache, config: &Config) -> Self {
        Self {
            cache: cache.scoped(RATE_LIMIT_PREFIX),
            window_secs: config.rate_limit_window().as_secs(),
            max_requests: config.rate_limit_requests,
        }
    }

    fn client_ip(req: &Request<Body>) -> String {
        // 从连接信息获取原始IP
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        // 优先使用代理头，其次连接IP
        req.headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or(remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim()
            .to_string()
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let ip = Self::client_ip(&req);

        // 窗口只在第一次请求时开始计时
        let count = match self.cache.increment(&ip, 1, Some(self.window_secs)).await {
            Some(count) => count,
            None => {
                tracing::warn!(ip = %ip, "Rate limit counter unavailable, allowing request");
                return next.run(req).await;
            }
        };

        if count > self.max_requests as i64 {
            tracing::info!(ip = %ip, count, "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!("请求过于频繁，请在{}秒后重试", self.window_secs),
                ),
            )
                .into_response();
        }

        next.run(req).await
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
