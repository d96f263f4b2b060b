use crate::model::Student;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub present: u32,
    pub absent: u32,
}

impl Tally {
    pub fn total(&self) -> u32 {
        self.present + self.absent
    }

    /// Share of present marks; a student without any recorded lesson counts as 100%.
    pub fn percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 100.0;
        }
        f64::from(self.present) * 100.0 / f64::from(total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentTally {
    pub student: Student,
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary<'a> {
    pub max_absent: u32,
    /// Empty when nobody has missed a lesson.
    pub most_absent: Vec<&'a StudentTally>,
    /// Students with at least one recorded lesson and no absences.
    pub no_absences: Vec<&'a StudentTally>,
}

pub fn group_summary(rows: &[StudentTally]) -> GroupSummary<'_> {
    let max_absent = rows.iter().map(|r| r.tally.absent).max().unwrap_or(0);
    let most_absent = if max_absent > 0 {
        rows.iter().filter(|r| r.tally.absent == max_absent).collect()
    } else {
        Vec::new()
    };
    let no_absences = rows
        .iter()
        .filter(|r| r.tally.absent == 0 && r.tally.total() > 0)
        .collect();
    GroupSummary {
        max_absent,
        most_absent,
        no_absences,
    }
}

pub fn format_percent(p: f64) -> String {
    format!("{:.1}%", p)
}
