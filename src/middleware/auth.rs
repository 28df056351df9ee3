use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    cache::SessionRecord,
    utils::{error_codes, error_to_api_response, hash_secret},
};

/// 通过校验的当前会话，作为请求扩展传给处理函数
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token_hash: String,
    pub session: SessionRecord,
}

fn bearer_secret(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        error_to_api_response::<()>(error_codes::AUTH_FAILED, "未授权访问".to_string()),
    )
        .into_response()
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(secret) = bearer_secret(&req) else {
        return unauthorized();
    };

    match state.sessions.validate_session(&secret).await {
        Some(session) => {
            req.extensions_mut().insert(CurrentSession {
                token_hash: hash_secret(&secret),
                session,
            });
            next.run(req).await
        }
        None => {
            tracing::debug!("Rejected request with invalid session");
            unauthorized()
        }
    }
}
