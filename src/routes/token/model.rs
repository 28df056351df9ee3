use serde::{Deserialize, Serialize};

use crate::cache::TokenPurpose;

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemTokenRequest {
    pub secret: String,
    pub purpose: TokenPurpose,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemTokenResponse {
    pub subject_id: String,
}
