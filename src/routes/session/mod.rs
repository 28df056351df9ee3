mod handler;
mod model;

pub use handler::{active_sessions, logout, logout_all};
pub use model::{ActiveSessionsResponse, LogoutAllResponse};
