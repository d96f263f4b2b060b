//! Per-conversation dialogue engine: sessions, flow states and their handlers.

mod handlers;
mod input;
mod reply;
mod router;
mod session;
mod state;

pub use router::handle_message;
pub use session::SessionStore;
pub use state::FlowState;
