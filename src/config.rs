use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::clock::{Clock, FixedClock, SystemClock};

/// Attendance journal dialogue daemon speaking JSON lines over stdin/stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "rollcalld")]
#[command(version)]
pub struct Config {
    /// SQLite database file
    #[arg(long, env = "ROLLCALL_DB", default_value = "group_journal.db")]
    pub db: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "ROLLCALL_LOG", default_value = "rollcalld=info")]
    pub log_filter: String,

    /// Pin "today" to a DD.MM.YYYY date instead of the local clock
    #[arg(long, env = "ROLLCALL_TODAY", value_parser = parse_day, hide = true)]
    pub today: Option<NaiveDate>,
}

impl Config {
    pub fn clock(&self) -> Box<dyn Clock> {
        match self.today {
            Some(d) => Box::new(FixedClock(d)),
            None => Box::new(SystemClock),
        }
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y")
        .map_err(|e| format!("expected DD.MM.YYYY: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_pinned_day() {
        let cfg = Config::try_parse_from(["rollcalld", "--today", "18.10.2026"]).expect("parse");
        assert_eq!(cfg.db, PathBuf::from("group_journal.db"));
        assert_eq!(
            cfg.clock().today(),
            NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
        );
        assert!(Config::try_parse_from(["rollcalld", "--today", "2026-10-18"]).is_err());
    }
}
