pub mod session;

pub use session::UserSessionEntity;
