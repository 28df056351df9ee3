use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, log_errors, rate_limit, session_auth},
    routes,
};

/// 组装路由：会话接口需要认证，整体加限流与错误日志
pub fn build_router(state: AppState) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(&state.cache, &state.config));

    let public_routes = Router::new()
        .route("/tokens/redeem", post(routes::token::redeem))
        .route("/internal/cache/stats", get(routes::internal::cache_stats));

    let protected_routes = Router::new()
        .route("/sessions/active", get(routes::session::active_sessions))
        .route("/sessions/logout", post(routes::session::logout))
        .route("/sessions/logout-all", post(routes::session::logout_all))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        .with_state(state)
}
