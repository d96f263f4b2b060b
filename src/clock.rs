use chrono::{Local, NaiveDate};

/// Source of "today" for date buttons and custom-date defaults.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pinned date, set from `--today` when a harness needs reproducible replies.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
