use serde::{Deserialize, Serialize};

use crate::cache::ActiveSession;

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveSessionsResponse {
    pub current: String,
    pub sessions: Vec<ActiveSession>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    pub removed: u64,
}
