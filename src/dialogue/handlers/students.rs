use tracing::info;

use super::{about_student, Ctx, FlowError, FlowResult, Step, EMPTY_ROSTER};
use crate::dialogue::reply::Reply;
use crate::dialogue::state::FlowState;
use crate::model::{HeadmanChange, InsertOutcome, Student};
use crate::store;

pub const NOT_SET: &str = "not set";

pub fn begin_add() -> Step {
    Step::goto(
        Reply::text("Enter the student's full name, or several names one per line:"),
        FlowState::AddStudents,
    )
}

pub fn on_names(ctx: &Ctx<'_>, text: &str) -> FlowResult {
    let names: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(Step::stay(Reply::text(
            "The list is empty. Enter at least one name:",
        )));
    }

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for name in names {
        match store::insert_student(ctx.conn, name)? {
            InsertOutcome::Added => added.push(name),
            InsertOutcome::Duplicate => skipped.push(name),
        }
    }
    info!(added = added.len(), skipped = skipped.len(), "students registered");

    let mut lines = Vec::new();
    if !added.is_empty() {
        lines.push(format!("Added students: {}", added.join(", ")));
    }
    if !skipped.is_empty() {
        lines.push(format!("Skipped (already listed): {}", skipped.join(", ")));
    }
    Ok(Step::done(Reply::text(lines.join("\n"))))
}

fn roster_guard(ctx: &Ctx<'_>) -> Result<Option<Step>, FlowError> {
    if store::list_students(ctx.conn)?.is_empty() {
        return Ok(Some(Step::done(Reply::text(EMPTY_ROSTER))));
    }
    Ok(None)
}

pub fn begin_remove(ctx: &Ctx<'_>) -> FlowResult {
    if let Some(step) = roster_guard(ctx)? {
        return Ok(step);
    }
    Ok(Step::goto(
        Reply::text("Enter the surname of the student to remove:"),
        FlowState::RemoveSurname,
    ))
}

pub fn remove(ctx: &Ctx<'_>, student: &Student) -> FlowResult {
    store::delete_student(ctx.conn, student.id).map_err(about_student(student))?;
    info!(student = %student.name, "student removed");
    Ok(Step::done(Reply::text(format!(
        "Student {} removed.",
        student.name
    ))))
}

pub fn list(ctx: &Ctx<'_>) -> FlowResult {
    let group = store::group_name(ctx.conn)?;
    let group = group.as_deref().unwrap_or(NOT_SET);
    let roster = store::list_students(ctx.conn)?;
    if roster.is_empty() {
        return Ok(Step::done(Reply::text(format!(
            "Group: {group}\nThe student list is empty."
        ))));
    }
    let rows: Vec<String> = roster
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.label()))
        .collect();
    Ok(Step::done(Reply::text(format!(
        "Group: {group}\nStudents:\n{}",
        rows.join("\n")
    ))))
}

pub fn begin_headman(ctx: &Ctx<'_>) -> FlowResult {
    if let Some(step) = roster_guard(ctx)? {
        return Ok(step);
    }
    Ok(Step::goto(
        Reply::text("Enter the surname of the student to appoint as headman:"),
        FlowState::HeadmanSurname,
    ))
}

pub fn appoint_headman(ctx: &Ctx<'_>, student: &Student) -> FlowResult {
    let change = store::assign_headman(ctx.conn, student.id).map_err(about_student(student))?;
    let text = match change {
        HeadmanChange::AlreadyHeadman => format!("{} is already the headman!", student.name),
        HeadmanChange::Assigned { previous } => {
            info!(student = %student.name, previous = ?previous, "headman assigned");
            format!(
                "{} is now the headman and will be flagged in the list.",
                student.name
            )
        }
    };
    Ok(Step::done(Reply::text(text)))
}
