use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::clock::Clock;
use crate::dialogue::SessionStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub db_path: PathBuf,
    pub db: Connection,
    pub sessions: SessionStore,
    pub clock: Box<dyn Clock>,
}
