pub mod chat;
pub mod core;
pub mod session;
