//! Button labels and parsing of typed answers.

use crate::model::{name_key, Lesson, LessonDate, Status, Student};

pub const TODAY_PREFIX: &str = "Today";
pub const OTHER_DATE: &str = "Another date";
pub const LESSON_BUTTONS: [&str; 4] = ["1\u{20e3}", "2\u{20e3}", "3\u{20e3}", "4\u{20e3}"];
pub const STATUS_BUTTONS: [&str; 2] = ["✅", "❌"];
pub const GROUP_CHANGE: &str = "Change";
pub const GROUP_KEEP: &str = "Keep";
pub const STATS_GROUP: &str = "Group summary";
pub const STATS_STUDENT: &str = "Single student";

const VARIATION_SELECTOR: char = '\u{fe0f}';
const KEYCAP: char = '\u{20e3}';

pub fn date_buttons(today: LessonDate) -> Vec<Vec<String>> {
    vec![
        vec![format!("{TODAY_PREFIX} ({today})")],
        vec![OTHER_DATE.to_string()],
    ]
}

pub fn lesson_buttons() -> Vec<Vec<&'static str>> {
    vec![
        vec![LESSON_BUTTONS[0], LESSON_BUTTONS[1]],
        vec![LESSON_BUTTONS[2], LESSON_BUTTONS[3]],
    ]
}

pub fn status_buttons() -> Vec<Vec<&'static str>> {
    vec![STATUS_BUTTONS.to_vec()]
}

fn date_part(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Accepts `day.month` (current year) or `day.month.year`, digits only.
pub fn parse_custom_date(text: &str, current_year: i32) -> Option<LessonDate> {
    let parts: Vec<&str> = text.trim().split('.').map(str::trim).collect();
    let (day, month, year) = match parts.as_slice() {
        [d, m] => (d, m, current_year),
        [d, m, y] if y.len() == 4 => (d, m, i32::try_from(date_part(y)?).ok()?),
        _ => return None,
    };
    LessonDate::new(date_part(day)?, date_part(month)?, year)
}

/// Lesson slot from a keycap button (with or without the emoji selector) or a bare digit.
pub fn parse_lesson(text: &str) -> Option<Lesson> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| *c != VARIATION_SELECTOR && *c != KEYCAP)
        .collect();
    if digits.chars().count() != 1 {
        return None;
    }
    Lesson::new(digits.parse().ok()?)
}

pub fn parse_status(text: &str) -> Option<Status> {
    let t: String = text
        .trim()
        .chars()
        .filter(|c| *c != VARIATION_SELECTOR)
        .collect();
    match t.as_str() {
        "✅" => Some(Status::Present),
        "❌" => Some(Status::Absent),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    None,
    One(Student),
    Many(Vec<Student>),
}

/// Case-insensitive "starts-with" filter over full names.
pub fn match_surname(roster: &[Student], fragment: &str) -> NameMatch {
    let key = name_key(fragment);
    let mut hits: Vec<Student> = roster
        .iter()
        .filter(|s| name_key(&s.name).starts_with(&key))
        .cloned()
        .collect();
    match hits.len() {
        0 => NameMatch::None,
        1 => NameMatch::One(hits.remove(0)),
        _ => NameMatch::Many(hits),
    }
}

/// Exact full-name pick among stored candidates, ignoring case.
pub fn match_full_name<'a>(candidates: &'a [Student], input: &str) -> Option<&'a Student> {
    let key = name_key(input);
    candidates.iter().find(|s| name_key(&s.name) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64, name: &str) -> Student {
        Student {
            id,
            name: name.to_string(),
            is_headman: false,
        }
    }

    #[test]
    fn custom_date_defaults_to_current_year() {
        let d = parse_custom_date("23.03", 2026).expect("date");
        assert_eq!(d.to_string(), "23.03.2026");
        let d = parse_custom_date(" 1.9.2025 ", 2026).expect("date with year");
        assert_eq!(d.to_string(), "01.09.2025");
    }

    #[test]
    fn custom_date_rejects_bad_input() {
        for raw in ["", "23", "32.01", "10.13", "0.5", "aa.bb", "23/03", "1.2.25", "1.2.3.4", "+5.+3", "5.+3", "1.2.+202", "-1.2"] {
            assert!(parse_custom_date(raw, 2026).is_none(), "{raw:?} accepted");
        }
    }

    #[test]
    fn lesson_accepts_keycaps_and_digits() {
        assert_eq!(parse_lesson("2\u{20e3}").map(Lesson::number), Some(2));
        assert_eq!(parse_lesson("3\u{fe0f}\u{20e3}").map(Lesson::number), Some(3));
        assert_eq!(parse_lesson("4").map(Lesson::number), Some(4));
        assert!(parse_lesson("5\u{20e3}").is_none());
        assert!(parse_lesson("12").is_none());
        assert!(parse_lesson("first").is_none());
    }

    #[test]
    fn status_buttons_parse() {
        assert_eq!(parse_status("✅"), Some(Status::Present));
        assert_eq!(parse_status(" ❌ "), Some(Status::Absent));
        assert_eq!(parse_status("yes"), None);
    }

    #[test]
    fn surname_prefix_is_case_insensitive() {
        let roster = vec![
            student(1, "Ivanov Ivan"),
            student(2, "Ivanova Maria"),
            student(3, "Petrov Petr"),
        ];
        assert_eq!(match_surname(&roster, "sid"), NameMatch::None);
        assert_eq!(match_surname(&roster, "PET"), NameMatch::One(roster[2].clone()));
        match match_surname(&roster, "ivanov") {
            NameMatch::Many(c) => assert_eq!(c.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert_eq!(
            match_full_name(&roster[..2], "ivanova maria").map(|s| s.id),
            Some(2)
        );
        assert!(match_full_name(&roster[..2], "Ivanov").is_none());
    }
}
