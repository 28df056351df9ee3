use axum::Json;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 统一响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            error_message: None,
            content: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            error_message: Some(message.into()),
            content: None,
        }
    }
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResult<T>> {
    Json(ApiResult::success(data))
}

pub fn error_to_api_response<T: Serialize>(code: i32, msg: String) -> Json<ApiResult<T>> {
    Json(ApiResult::error(code, msg))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const AUTH_FAILED: i32 = 1002;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INVALID_TOKEN: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// 计算秘密值的 SHA-256 摘要（小写十六进制，64 个字符）
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// 生成 256 位随机秘密值，十六进制编码
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
