use chrono::{Datelike, NaiveDate};
use std::fmt;

pub type StudentId = i64;

pub const HEADMAN_FLAG: &str = " (📋)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub is_headman: bool,
}

impl Student {
    /// Name with the headman marker appended when the flag is set.
    pub fn label(&self) -> String {
        if self.is_headman {
            format!("{}{}", self.name, HEADMAN_FLAG)
        } else {
            self.name.clone()
        }
    }
}

/// Case folding used for name uniqueness and surname matching.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(Status::Present),
            "absent" => Some(Status::Absent),
            _ => None,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Status::Present => "✅",
            Status::Absent => "❌",
        }
    }
}

/// Calendar day of a lesson, rendered as `DD.MM.YYYY`.
///
/// Only the ranges day 1..=31 and month 1..=12 are checked, so `31.02` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonDate {
    day: u32,
    month: u32,
    year: i32,
}

impl LessonDate {
    pub fn new(day: u32, month: u32, year: i32) -> Option<Self> {
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return None;
        }
        Some(Self { day, month, year })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl From<NaiveDate> for LessonDate {
    fn from(d: NaiveDate) -> Self {
        Self {
            day: d.day(),
            month: d.month(),
            year: d.year(),
        }
    }
}

impl fmt::Display for LessonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day, self.month, self.year)
    }
}

pub const LESSON_SLOTS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lesson(u8);

impl Lesson {
    pub fn new(n: u8) -> Option<Self> {
        (1..=LESSON_SLOTS).contains(&n).then_some(Self(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadmanChange {
    AlreadyHeadman,
    Assigned { previous: Option<String> },
}

/// One roster row of a lesson; `status` is `None` when nothing was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonMark {
    pub student: Student,
    pub status: Option<Status>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_date_formats_with_padding() {
        let d = LessonDate::new(3, 9, 2026).expect("valid date");
        assert_eq!(d.to_string(), "03.09.2026");
    }

    #[test]
    fn lesson_date_rejects_out_of_range_parts() {
        assert!(LessonDate::new(0, 5, 2026).is_none());
        assert!(LessonDate::new(32, 5, 2026).is_none());
        assert!(LessonDate::new(10, 13, 2026).is_none());
        assert!(LessonDate::new(31, 2, 2026).is_some());
    }

    #[test]
    fn lesson_slots_are_one_to_four() {
        assert!(Lesson::new(0).is_none());
        assert_eq!(Lesson::new(4).map(Lesson::number), Some(4));
        assert!(Lesson::new(5).is_none());
    }

    #[test]
    fn headman_label_carries_flag() {
        let s = Student {
            id: 1,
            name: "Smirnov".into(),
            is_headman: true,
        };
        assert_eq!(s.label(), "Smirnov (📋)");
        assert_eq!(name_key("  ИВАНОВ Иван "), "иванов иван");
    }
}
