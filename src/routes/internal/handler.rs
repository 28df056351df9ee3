use axum::{Json, extract::State};

use crate::{
    AppState,
    cache::CacheStats,
    utils::{ApiResult, success_to_api_response},
};

/// 缓存状态，供运维查看
pub async fn cache_stats(State(state): State<AppState>) -> Json<ApiResult<CacheStats>> {
    success_to_api_response(state.cache.get_stats().await)
}
