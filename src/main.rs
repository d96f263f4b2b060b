mod calc;
mod clock;
mod config;
mod db;
mod dialogue;
mod ipc;
mod model;
mod store;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();
    init_tracing(&cfg);

    let db = db::open_db(&cfg.db)
        .with_context(|| format!("open journal database {}", cfg.db.display()))?;
    let mut state = ipc::AppState {
        db_path: cfg.db.clone(),
        db,
        sessions: dialogue::SessionStore::new(),
        clock: cfg.clock(),
    };
    info!(version = env!("CARGO_PKG_VERSION"), db = %cfg.db.display(), "rollcalld ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to echo back.
                warn!(error = %e, "unparseable request line");
                json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                })
            }
        };
        writeln!(stdout, "{resp}").context("write response")?;
        stdout.flush().context("flush response")?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
