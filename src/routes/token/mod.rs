mod handler;
mod model;

pub use handler::redeem;
pub use model::{RedeemTokenRequest, RedeemTokenResponse};
