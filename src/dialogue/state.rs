use crate::model::{Lesson, LessonDate, Student};

/// Flows that start with the shared date and lesson picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonPurpose {
    Mark,
    EditMark,
    ListMark,
}

impl LessonPurpose {
    pub fn flow(self) -> &'static str {
        match self {
            LessonPurpose::Mark => "mark",
            LessonPurpose::EditMark => "edit_mark",
            LessonPurpose::ListMark => "list_mark",
        }
    }
}

/// What happens once a surname fragment resolves to exactly one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTarget {
    Remove,
    Headman,
    EditMark { date: LessonDate, lesson: Lesson },
    Stats,
}

impl NameTarget {
    pub fn flow(self) -> &'static str {
        match self {
            NameTarget::Remove => "remove_student",
            NameTarget::Headman => "set_headman",
            NameTarget::EditMark { .. } => "edit_mark",
            NameTarget::Stats => "stats",
        }
    }
}

/// Current step of a session's flow together with the answers collected so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AddStudents,
    RemoveSurname,
    PickDate {
        purpose: LessonPurpose,
    },
    PickCustomDate {
        purpose: LessonPurpose,
    },
    PickLesson {
        purpose: LessonPurpose,
        date: LessonDate,
    },
    RollCall {
        date: LessonDate,
        lesson: Lesson,
        queue: Vec<Student>,
        cursor: usize,
    },
    EditSurname {
        date: LessonDate,
        lesson: Lesson,
    },
    EditStatus {
        date: LessonDate,
        lesson: Lesson,
        student: Student,
    },
    HeadmanSurname,
    GroupChoice,
    GroupName,
    StatsMode,
    StatsSurname,
    FullName {
        target: NameTarget,
        candidates: Vec<Student>,
    },
}

impl FlowState {
    /// Stable dotted name used in logs and `session.get`.
    pub fn tag(&self) -> String {
        match self {
            FlowState::AddStudents => "add_student.names".into(),
            FlowState::RemoveSurname => "remove_student.surname".into(),
            FlowState::PickDate { purpose } => format!("{}.date", purpose.flow()),
            FlowState::PickCustomDate { purpose } => format!("{}.custom_date", purpose.flow()),
            FlowState::PickLesson { purpose, .. } => format!("{}.lesson", purpose.flow()),
            FlowState::RollCall { .. } => "mark.roll_call".into(),
            FlowState::EditSurname { .. } => "edit_mark.surname".into(),
            FlowState::EditStatus { .. } => "edit_mark.status".into(),
            FlowState::HeadmanSurname => "set_headman.surname".into(),
            FlowState::GroupChoice => "set_group.choice".into(),
            FlowState::GroupName => "set_group.name".into(),
            FlowState::StatsMode => "stats.mode".into(),
            FlowState::StatsSurname => "stats.surname".into(),
            FlowState::FullName { target, .. } => format!("{}.full_name", target.flow()),
        }
    }
}
