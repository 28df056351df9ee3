pub mod internal;
pub mod session;
pub mod token;
