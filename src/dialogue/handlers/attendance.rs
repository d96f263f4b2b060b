use rusqlite::Connection;
use tracing::{debug, info};

use super::{about_student, Ctx, FlowError, FlowResult, Step, EMPTY_ROSTER};
use crate::dialogue::input;
use crate::dialogue::reply::Reply;
use crate::dialogue::state::FlowState;
use crate::model::{Lesson, LessonDate, Status, Student, UpsertOutcome};
use crate::store::{self, StoreResult};

const UNKNOWN_MARK: &str = "❓";

/// Product assumption: the headman operates the bot, so every roll call marks
/// them present without asking. Returns the headman when one was marked.
pub fn auto_mark_headman(
    conn: &Connection,
    roster: &[Student],
    date: LessonDate,
    lesson: Lesson,
) -> StoreResult<Option<Student>> {
    let Some(headman) = roster.iter().find(|s| s.is_headman) else {
        return Ok(None);
    };
    store::upsert_attendance(conn, headman.id, date, lesson, Status::Present)?;
    debug!(headman = %headman.name, %date, %lesson, "headman auto-marked present");
    Ok(Some(headman.clone()))
}

fn roll_call_prompt(student: &Student) -> Reply {
    Reply::text(format!("Mark attendance for {}:", student.name))
        .with_buttons(input::status_buttons())
}

pub fn begin_roll_call(ctx: &Ctx<'_>, date: LessonDate, lesson: Lesson) -> FlowResult {
    let roster = store::list_students(ctx.conn)?;
    if roster.is_empty() {
        return Ok(Step::done(Reply::text(EMPTY_ROSTER).remove_keyboard()));
    }

    let headman = auto_mark_headman(ctx.conn, &roster, date, lesson)?;
    let queue: Vec<Student> = roster.into_iter().filter(|s| !s.is_headman).collect();

    let Some(first) = queue.first() else {
        return Ok(Step::done(
            Reply::text("All students are marked (the headman is the only one in the group)!")
                .remove_keyboard(),
        ));
    };

    let mut prompt = roll_call_prompt(first);
    if let Some(h) = headman {
        prompt.text = format!("{} (headman) is marked present.\n{}", h.name, prompt.text);
    }
    Ok(Step::goto(
        prompt,
        FlowState::RollCall {
            date,
            lesson,
            queue,
            cursor: 0,
        },
    ))
}

pub fn on_roll_call(
    ctx: &Ctx<'_>,
    date: LessonDate,
    lesson: Lesson,
    queue: &[Student],
    cursor: usize,
    text: &str,
) -> FlowResult {
    let Some(status) = input::parse_status(text) else {
        return Ok(Step::stay(Reply::text("Choose ✅ or ❌ with the buttons.")));
    };
    let Some(student) = queue.get(cursor) else {
        return Err(FlowError::MissingReference("the roll call position".into()));
    };
    store::upsert_attendance(ctx.conn, student.id, date, lesson, status)
        .map_err(about_student(student))?;

    let next = cursor + 1;
    match queue.get(next) {
        Some(following) => Ok(Step::goto(
            roll_call_prompt(following),
            FlowState::RollCall {
                date,
                lesson,
                queue: queue.to_vec(),
                cursor: next,
            },
        )),
        None => {
            info!(%date, %lesson, marked = queue.len(), "roll call finished");
            Ok(Step::done(
                Reply::text("All students are marked!").remove_keyboard(),
            ))
        }
    }
}

pub fn ask_edit_student(ctx: &Ctx<'_>, date: LessonDate, lesson: Lesson) -> FlowResult {
    if store::list_students(ctx.conn)?.is_empty() {
        return Ok(Step::done(Reply::text(EMPTY_ROSTER).remove_keyboard()));
    }
    Ok(Step::goto(
        Reply::text("Enter the surname of the student whose mark should be corrected:")
            .remove_keyboard(),
        FlowState::EditSurname { date, lesson },
    ))
}

pub fn ask_edit_status(date: LessonDate, lesson: Lesson, student: Student) -> Step {
    Step::goto(
        Reply::text(format!("Choose the new status for {}:", student.name))
            .with_buttons(input::status_buttons()),
        FlowState::EditStatus {
            date,
            lesson,
            student,
        },
    )
}

pub fn on_edit_status(
    ctx: &Ctx<'_>,
    date: LessonDate,
    lesson: Lesson,
    student: &Student,
    text: &str,
) -> FlowResult {
    let Some(status) = input::parse_status(text) else {
        return Ok(Step::stay(Reply::text("Choose ✅ or ❌ with the buttons.")));
    };
    let outcome = store::upsert_attendance(ctx.conn, student.id, date, lesson, status)
        .map_err(about_student(student))?;
    let text = match outcome {
        UpsertOutcome::Updated => format!(
            "The mark for {} on {date}, lesson {lesson} was changed to {}.",
            student.name,
            status.glyph()
        ),
        UpsertOutcome::Inserted => format!(
            "The mark for {} on {date}, lesson {lesson} was added as {}.",
            student.name,
            status.glyph()
        ),
    };
    info!(student = %student.name, %date, %lesson, ?outcome, "mark corrected");
    Ok(Step::done(Reply::text(text).remove_keyboard()))
}

pub fn list_lesson(ctx: &Ctx<'_>, date: LessonDate, lesson: Lesson) -> FlowResult {
    let marks = store::lesson_marks(ctx.conn, date, lesson)?;
    if marks.is_empty() {
        return Ok(Step::done(
            Reply::text(format!("No attendance data for {date}, lesson {lesson}."))
                .remove_keyboard(),
        ));
    }
    let rows: Vec<String> = marks
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mark = m.status.map(Status::glyph).unwrap_or(UNKNOWN_MARK);
            format!("{}. {}: {}", i + 1, m.student.label(), mark)
        })
        .collect();
    Ok(Step::done(
        Reply::text(format!(
            "Attendance for {date}, lesson {lesson}:\n{}",
            rows.join("\n")
        ))
        .remove_keyboard(),
    ))
}
