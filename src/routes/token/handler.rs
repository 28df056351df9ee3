use axum::{Json, extract::State};

use crate::{
    AppState,
    error::TokenError,
    utils::{ApiResult, success_to_api_response},
};

use super::model::{RedeemTokenRequest, RedeemTokenResponse};

/// 兑换一次性令牌，成功后令牌失效
pub async fn redeem(
    State(state): State<AppState>,
    Json(req): Json<RedeemTokenRequest>,
) -> Result<Json<ApiResult<RedeemTokenResponse>>, TokenError> {
    let subject_id = state.tokens.redeem(&req.secret, req.purpose).await?;
    Ok(success_to_api_response(RedeemTokenResponse { subject_id }))
}
