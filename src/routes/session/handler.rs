use axum::{
    Json,
    extract::{Extension, State},
};

use crate::{
    AppState,
    middleware::CurrentSession,
    utils::{ApiResult, success_to_api_response},
};

use super::model::{ActiveSessionsResponse, LogoutAllResponse};

/// 当前用户的设备列表
pub async fn active_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Json<ApiResult<ActiveSessionsResponse>> {
    let sessions = state
        .sessions
        .get_user_active_sessions(&current.session.subject_id)
        .await;

    success_to_api_response(ActiveSessionsResponse {
        current: current.token_hash,
        sessions,
    })
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Json<ApiResult<()>> {
    state
        .sessions
        .invalidate_session_by_hash(&current.token_hash)
        .await;
    success_to_api_response(())
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Json<ApiResult<LogoutAllResponse>> {
    let removed = state
        .sessions
        .invalidate_all_user_sessions(&current.session.subject_id)
        .await;
    tracing::info!(subject_id = %current.session.subject_id, removed, "Logged out all sessions");
    success_to_api_response(LogoutAllResponse { removed })
}
