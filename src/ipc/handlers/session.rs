use serde_json::json;
use tracing::debug;

use crate::dialogue::FlowState;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_chat_id, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let chat_id = get_chat_id(&req.params)?;
    let tag = state.sessions.flow(&chat_id).map(FlowState::tag);
    Ok(ok(
        &req.id,
        json!({
            "active": tag.is_some(),
            "state": tag,
        }),
    ))
}

fn handle_end(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let chat_id = get_chat_id(&req.params)?;
    let evicted = state.sessions.evict(&chat_id);
    debug!(%chat_id, evicted, sessions = state.sessions.len(), "session ended");
    Ok(ok(&req.id, json!({ "evicted": evicted })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "session.get" => handle_get(state, req),
        "session.end" => handle_end(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e.response(&req.id)))
}
