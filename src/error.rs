use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 键值存储（Redis）错误
#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("value at {key} is not an integer")]
    NotAnInteger { key: String },
    #[error("increment of {key} would overflow")]
    Overflow { key: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// 持久化存储错误
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// 一次性令牌错误，唯一允许传递给调用方的业务错误
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    InvalidOrExpired,
    #[error("token store error: {0}")]
    Store(#[from] KvError),
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            TokenError::InvalidOrExpired => (
                StatusCode::BAD_REQUEST,
                error_codes::INVALID_TOKEN,
                "令牌无效或已过期",
            ),
            TokenError::Store(e) => {
                tracing::error!("Token store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误",
                )
            }
        };

        (status, error_to_api_response::<()>(code, message.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_maps_to_bad_request() {
        let response = TokenError::InvalidOrExpired.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_maps_to_server_error() {
        let response =
            TokenError::Store(KvError::Unavailable("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
