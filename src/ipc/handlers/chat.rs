use serde_json::json;
use tracing::debug;

use crate::dialogue;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_chat_id, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::LessonDate;

fn handle_message(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let chat_id = get_chat_id(&req.params)?;
    let text = get_required_str(&req.params, "text")?;
    let today = LessonDate::from(state.clock.today());

    let reply = dialogue::handle_message(&state.db, today, &mut state.sessions, &chat_id, &text);
    debug!(%chat_id, replied = reply.is_some(), "message handled");
    Ok(ok(&req.id, json!({ "reply": reply })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "message" => Some(handle_message(state, req).unwrap_or_else(|e| e.response(&req.id))),
        _ => None,
    }
}
