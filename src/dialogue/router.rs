use rusqlite::Connection;
use tracing::{debug, error, warn};

use super::handlers::{
    attendance, group, names, picker, stats, students, Ctx, FlowError, FlowResult, Next, Step,
};
use super::reply::Reply;
use super::session::SessionStore;
use super::state::{FlowState, LessonPurpose, NameTarget};
use crate::model::LessonDate;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    AddStudent,
    RemoveStudent,
    ListStudents,
    Mark,
    EditMark,
    ListMark,
    SetHeadman,
    SetGroup,
    Stats,
    Cancel,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::Start,
        Command::AddStudent,
        Command::RemoveStudent,
        Command::ListStudents,
        Command::Mark,
        Command::EditMark,
        Command::ListMark,
        Command::SetHeadman,
        Command::SetGroup,
        Command::Stats,
        Command::Cancel,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::AddStudent => "add_student",
            Command::RemoveStudent => "remove_student",
            Command::ListStudents => "list_students",
            Command::Mark => "mark",
            Command::EditMark => "edit_mark",
            Command::ListMark => "list_mark",
            Command::SetHeadman => "set_headman",
            Command::SetGroup => "set_group",
            Command::Stats => "stats",
            Command::Cancel => "cancel",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Command::Start => "show this help",
            Command::AddStudent => "register students",
            Command::RemoveStudent => "remove a student",
            Command::ListStudents => "show the group roster",
            Command::Mark => "take attendance for a lesson",
            Command::EditMark => "correct one mark",
            Command::ListMark => "show attendance for a lesson",
            Command::SetHeadman => "appoint the headman",
            Command::SetGroup => "set the group name",
            Command::Stats => "attendance statistics",
            Command::Cancel => "abandon the current dialogue",
        }
    }

    /// `/keyword` or `/keyword@bot` always parses; a bare keyword only when `allow_bare`.
    pub fn parse(text: &str, allow_bare: bool) -> Option<Command> {
        let t = text.trim();
        let word = match t.strip_prefix('/') {
            Some(rest) => rest.split('@').next().unwrap_or(rest),
            None if allow_bare => t,
            None => return None,
        };
        let word = word.to_ascii_lowercase();
        Command::ALL.into_iter().find(|c| c.keyword() == word)
    }
}

fn greeting() -> Reply {
    let mut text = String::from(
        "Hi! I keep the attendance journal of the group.\nCommands:",
    );
    for c in Command::ALL {
        text.push_str(&format!("\n/{} - {}", c.keyword(), c.summary()));
    }
    Reply::text(text).remove_keyboard()
}

fn start_command(ctx: &Ctx<'_>, cmd: Command, had_flow: bool) -> FlowResult {
    match cmd {
        Command::Start => Ok(Step::done(greeting())),
        Command::Cancel => Ok(Step::done(
            Reply::text(if had_flow {
                "Cancelled."
            } else {
                "Nothing to cancel."
            })
            .remove_keyboard(),
        )),
        Command::AddStudent => Ok(students::begin_add()),
        Command::RemoveStudent => students::begin_remove(ctx),
        Command::ListStudents => students::list(ctx),
        Command::Mark => Ok(picker::begin(ctx, LessonPurpose::Mark)),
        Command::EditMark => Ok(picker::begin(ctx, LessonPurpose::EditMark)),
        Command::ListMark => Ok(picker::begin(ctx, LessonPurpose::ListMark)),
        Command::SetHeadman => students::begin_headman(ctx),
        Command::SetGroup => group::begin(ctx),
        Command::Stats => Ok(stats::begin()),
    }
}

/// Exactly one handler per state.
fn dispatch(ctx: &Ctx<'_>, state: &FlowState, text: &str) -> FlowResult {
    match state {
        FlowState::AddStudents => students::on_names(ctx, text),
        FlowState::RemoveSurname => names::on_surname(ctx, NameTarget::Remove, text),
        FlowState::PickDate { purpose } => Ok(picker::on_date_choice(ctx, *purpose, text)),
        FlowState::PickCustomDate { purpose } => Ok(picker::on_custom_date(ctx, *purpose, text)),
        FlowState::PickLesson { purpose, date } => picker::on_lesson(ctx, *purpose, *date, text),
        FlowState::RollCall {
            date,
            lesson,
            queue,
            cursor,
        } => attendance::on_roll_call(ctx, *date, *lesson, queue, *cursor, text),
        FlowState::EditSurname { date, lesson } => names::on_surname(
            ctx,
            NameTarget::EditMark {
                date: *date,
                lesson: *lesson,
            },
            text,
        ),
        FlowState::EditStatus {
            date,
            lesson,
            student,
        } => attendance::on_edit_status(ctx, *date, *lesson, student, text),
        FlowState::HeadmanSurname => names::on_surname(ctx, NameTarget::Headman, text),
        FlowState::GroupChoice => group::on_choice(ctx, text),
        FlowState::GroupName => group::on_name(ctx, text),
        FlowState::StatsMode => stats::on_mode(ctx, text),
        FlowState::StatsSurname => names::on_surname(ctx, NameTarget::Stats, text),
        FlowState::FullName { target, candidates } => {
            names::on_full_name(ctx, *target, candidates, text)
        }
    }
}

fn abandon_notice(err: &FlowError) -> Reply {
    let text = match err {
        FlowError::MissingReference(what) => {
            format!("Error: {what} is no longer available. Start again.")
        }
        FlowError::Store(StoreError::MissingStudent(_)) => {
            "Error: the student is no longer in the list. Start again.".to_string()
        }
        FlowError::Store(StoreError::Sqlite(_)) => {
            "Something went wrong, the dialogue was cancelled. Try again.".to_string()
        }
    };
    Reply::text(text).remove_keyboard()
}

/// Routes one incoming message; `None` means the message is ignored.
pub fn handle_message(
    conn: &Connection,
    today: LessonDate,
    sessions: &mut SessionStore,
    chat_id: &str,
    text: &str,
) -> Option<Reply> {
    let ctx = Ctx { conn, today };
    let current = sessions.flow(chat_id).cloned();
    let command = Command::parse(text, current.is_none());
    if current.is_none() && command.is_none() {
        // Idle chatter never creates a session.
        if text.trim_start().starts_with('/') {
            return Some(Reply::text(
                "Unknown command. Send /start to see the list of commands.",
            ));
        }
        return None;
    }
    let seen = sessions.touch(chat_id).messages;
    debug!(chat_id, seen, state = ?current.as_ref().map(FlowState::tag), "message received");

    let result = match command {
        Some(cmd) => {
            if let Some(prev) = &current {
                debug!(chat_id, abandoned = %prev.tag(), command = cmd.keyword(), "flow replaced");
            }
            sessions.clear_flow(chat_id);
            start_command(&ctx, cmd, current.is_some())
        }
        None => match &current {
            Some(state) => dispatch(&ctx, state, text),
            None => return None,
        },
    };

    match result {
        Ok(step) => {
            match step.next {
                Next::Stay => {}
                Next::Goto(state) => {
                    debug!(chat_id, state = %state.tag(), "flow advanced");
                    sessions.set_flow(chat_id, state);
                }
                Next::Done => {
                    sessions.clear_flow(chat_id);
                }
            }
            Some(step.reply)
        }
        Err(e) => {
            match &e {
                FlowError::Store(StoreError::Sqlite(inner)) => {
                    error!(chat_id, error = %inner, "storage failure, flow abandoned");
                }
                other => warn!(chat_id, error = %other, "flow abandoned"),
            }
            sessions.clear_flow(chat_id);
            Some(abandon_notice(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::dialogue::reply::Keyboard;
    use crate::store;

    struct Harness {
        conn: Connection,
        sessions: SessionStore,
        today: LessonDate,
    }

    impl Harness {
        fn new() -> Self {
            let conn = Connection::open_in_memory().expect("open in-memory db");
            db::init_schema(&conn).expect("init schema");
            Self {
                conn,
                sessions: SessionStore::new(),
                today: LessonDate::new(18, 10, 2026).expect("date"),
            }
        }

        fn send(&mut self, text: &str) -> Reply {
            self.send_as("chat-1", text)
        }

        fn send_as(&mut self, chat: &str, text: &str) -> Reply {
            handle_message(&self.conn, self.today, &mut self.sessions, chat, text)
                .unwrap_or_else(|| panic!("no reply to {text:?}"))
        }

        fn state(&self) -> Option<String> {
            self.sessions.flow("chat-1").map(FlowState::tag)
        }

        fn register(&mut self, names: &str) {
            self.send("/add_student");
            self.send(names);
        }

        fn status_of(&self, name: &str, date: &str, lesson: i64) -> Option<String> {
            self.conn
                .query_row(
                    "SELECT a.status FROM attendance a JOIN students s ON s.id = a.student_id
                     WHERE s.name = ? AND a.date = ? AND a.lesson = ?",
                    (name, date, lesson),
                    |r| r.get(0),
                )
                .ok()
        }
    }

    #[test]
    fn command_parsing_forms() {
        assert_eq!(Command::parse("/mark", false), Some(Command::Mark));
        assert_eq!(Command::parse(" /Stats@journal_bot ", false), Some(Command::Stats));
        assert_eq!(Command::parse("mark", true), Some(Command::Mark));
        assert_eq!(Command::parse("mark", false), None);
        assert_eq!(Command::parse("/unknown", true), None);
    }

    #[test]
    fn stray_text_is_ignored_and_unknown_commands_are_reported() {
        let mut h = Harness::new();
        assert!(handle_message(&h.conn, h.today, &mut h.sessions, "chat-1", "hello").is_none());
        let r = h.send("/frobnicate");
        assert!(r.text.starts_with("Unknown command"));
        assert_eq!(h.sessions.len(), 0, "idle chatter must not create sessions");

        h.send("/list_students");
        assert_eq!(h.sessions.len(), 1);
        assert_eq!(h.state(), None);
    }

    #[test]
    fn registration_skips_case_insensitive_duplicates() {
        let mut h = Harness::new();
        h.send("/add_student");
        assert_eq!(h.state().as_deref(), Some("add_student.names"));

        let r = h.send("  \n ");
        assert!(r.text.contains("empty"));
        assert_eq!(h.state().as_deref(), Some("add_student.names"));

        let r = h.send("Ivanov\nPetrov");
        assert_eq!(r.text, "Added students: Ivanov, Petrov");
        assert_eq!(h.state(), None);

        h.send("/add_student");
        let r = h.send("ivanov");
        assert_eq!(r.text, "Skipped (already listed): ivanov");
        assert_eq!(store::list_students(&h.conn).unwrap().len(), 2);
    }

    #[test]
    fn roll_call_auto_marks_headman_and_walks_roster_in_name_order() {
        let mut h = Harness::new();
        h.register("Smirnov\nPetrov\nAbramov");
        h.send("/set_headman");
        let r = h.send("smir");
        assert!(r.text.contains("Smirnov is now the headman"));

        let r = h.send("/mark");
        assert_eq!(
            r.keyboard,
            Keyboard::Buttons {
                rows: vec![vec!["Today (18.10.2026)".into()], vec!["Another date".into()]]
            }
        );
        let r = h.send("Today (18.10.2026)");
        assert_eq!(r.text, "Choose the lesson number:");

        let r = h.send("2\u{20e3}");
        assert!(r.text.starts_with("Smirnov (headman) is marked present."));
        assert!(r.text.ends_with("Mark attendance for Abramov:"));
        assert_eq!(h.status_of("Smirnov", "18.10.2026", 2).as_deref(), Some("present"));
        assert_eq!(h.state().as_deref(), Some("mark.roll_call"));

        let r = h.send("maybe");
        assert!(r.text.contains("Choose ✅ or ❌"));

        let r = h.send("❌");
        assert_eq!(r.text, "Mark attendance for Petrov:");
        let r = h.send("✅");
        assert_eq!(r.text, "All students are marked!");
        assert_eq!(r.keyboard, Keyboard::Remove);
        assert_eq!(h.state(), None);

        assert_eq!(h.status_of("Abramov", "18.10.2026", 2).as_deref(), Some("absent"));
        assert_eq!(h.status_of("Petrov", "18.10.2026", 2).as_deref(), Some("present"));
    }

    #[test]
    fn roll_call_edge_rosters() {
        let mut h = Harness::new();
        h.send("/mark");
        h.send("Today");
        let r = h.send("1");
        assert!(r.text.contains("student list is empty"));
        assert_eq!(h.state(), None);

        h.register("Smirnov");
        h.send("/set_headman");
        h.send("Smirnov");
        h.send("/mark");
        h.send("Another date");
        assert_eq!(h.state().as_deref(), Some("mark.custom_date"));
        let r = h.send("31.13");
        assert!(r.text.starts_with("Wrong format"));
        h.send("01.09");
        let r = h.send("4\u{20e3}");
        assert!(r.text.contains("only one in the group"));
        assert_eq!(h.status_of("Smirnov", "01.09.2026", 4).as_deref(), Some("present"));
    }

    #[test]
    fn removal_disambiguates_through_full_name_state() {
        let mut h = Harness::new();
        h.register("Ivanov Ivan\nIvanova Maria\nPetrov");
        h.send("/remove_student");
        let r = h.send("nobody");
        assert!(r.text.starts_with("No student"));

        let r = h.send("ivanov");
        assert!(r.text.contains("Ivanov Ivan\nIvanova Maria"));
        assert_eq!(h.state().as_deref(), Some("remove_student.full_name"));

        let r = h.send("Ivanov");
        assert!(r.text.starts_with("Full name not found"));
        let r = h.send("IVANOVA MARIA");
        assert_eq!(r.text, "Student Ivanova Maria removed.");
        assert_eq!(h.state(), None);

        let names: Vec<String> = store::list_students(&h.conn)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Ivanov Ivan", "Petrov"]);
    }

    #[test]
    fn edit_mark_reports_insert_then_update() {
        let mut h = Harness::new();
        h.register("Ivanov Ivan\nIvanova Maria");

        h.send("/edit_mark");
        h.send("Today");
        h.send("3");
        assert_eq!(h.state().as_deref(), Some("edit_mark.surname"));
        h.send("ivanov");
        assert_eq!(h.state().as_deref(), Some("edit_mark.full_name"));
        let r = h.send("ivanov ivan");
        assert_eq!(r.text, "Choose the new status for Ivanov Ivan:");
        let r = h.send("❌");
        assert_eq!(
            r.text,
            "The mark for Ivanov Ivan on 18.10.2026, lesson 3 was added as ❌."
        );

        h.send("/edit_mark");
        h.send("Today");
        h.send("3");
        h.send("Ivanov Ivan");
        let r = h.send("✅");
        assert!(r.text.ends_with("was changed to ✅."));
        assert_eq!(h.status_of("Ivanov Ivan", "18.10.2026", 3).as_deref(), Some("present"));
    }

    #[test]
    fn list_mark_shows_unknown_for_missing_records() {
        let mut h = Harness::new();
        h.register("Ivanov\nPetrov");
        h.send("/set_headman");
        h.send("Petrov");
        h.send("/edit_mark");
        h.send("Today");
        h.send("1");
        h.send("Ivanov");
        h.send("✅");

        h.send("/list_mark");
        h.send("Today");
        let r = h.send("1");
        assert_eq!(
            r.text,
            "Attendance for 18.10.2026, lesson 1:\n1. Ivanov: ✅\n2. Petrov (📋): ❓"
        );
        assert_eq!(h.state(), None);
    }

    #[test]
    fn set_group_unset_then_keep() {
        let mut h = Harness::new();
        let r = h.send("/set_group");
        assert_eq!(r.text, "Enter the group name:");
        let r = h.send("   ");
        assert!(r.text.contains("can't be empty"));
        let r = h.send("CS-101");
        assert_eq!(r.text, "Group name set: CS-101");

        let r = h.send("/set_group");
        assert!(r.text.contains("Current group name: CS-101"));
        let r = h.send("whatever");
        assert_eq!(r.text, "Choose one of the buttons!");
        let r = h.send("Keep");
        assert_eq!(r.text, "The group name stays: CS-101");
        assert_eq!(store::group_name(&h.conn).unwrap().as_deref(), Some("CS-101"));

        h.send("/set_group");
        h.send("Change");
        h.send("CS-102");
        assert_eq!(store::group_name(&h.conn).unwrap().as_deref(), Some("CS-102"));
    }

    #[test]
    fn stats_group_and_single_student() {
        let mut h = Harness::new();
        h.register("Ivanov\nPetrov\nSidorov");
        for (lesson, ivanov, petrov) in [("1", "✅", "❌"), ("2", "✅", "✅"), ("3", "❌", "✅"), ("4", "✅", "✅")] {
            h.send("/mark");
            h.send("Today");
            h.send(lesson);
            h.send(ivanov);
            h.send(petrov);
            h.send("✅");
        }

        h.send("/stats");
        let r = h.send("Group summary");
        assert!(r.text.contains("Missed the most lessons:\n- Ivanov: 1 absences\n- Petrov: 1 absences"));
        assert!(r.text.contains("No absences:\n- Sidorov"));
        assert!(r.text.contains("- Ivanov: 75.0% (4 lessons)"));
        assert!(r.text.contains("- Sidorov: 100.0% (4 lessons)"));

        h.send("/stats");
        h.send("Single student");
        let r = h.send("petr");
        assert_eq!(
            r.text,
            "Statistics for Petrov (group: not set):\nTotal lessons: 4\nPresent: 3\nAbsent: 1\nAttendance rate: 75.0%"
        );
    }

    #[test]
    fn new_command_replaces_active_flow_and_cancel_clears() {
        let mut h = Harness::new();
        h.send("/add_student");
        h.send("/stats");
        assert_eq!(h.state().as_deref(), Some("stats.mode"));

        // A bare keyword mid-flow is an answer, not a command.
        let r = h.send("mark");
        assert_eq!(r.text, "Choose one of the buttons!");

        let r = h.send("/cancel");
        assert_eq!(r.text, "Cancelled.");
        assert_eq!(h.state(), None);
        let r = h.send("cancel");
        assert_eq!(r.text, "Nothing to cancel.");
    }

    #[test]
    fn student_removed_elsewhere_abandons_roll_call() {
        let mut h = Harness::new();
        h.register("Abramov\nPetrov");
        h.send("/mark");
        h.send("Today");
        h.send("1");

        h.send_as("chat-2", "/remove_student");
        h.send_as("chat-2", "Abramov");

        let r = h.send("✅");
        assert!(r.text.starts_with("Error: student Abramov is no longer available"));
        assert_eq!(h.state(), None);
        assert_eq!(h.sessions.flow("chat-2"), None);
    }
}
