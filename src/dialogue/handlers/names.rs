//! Surname-prefix resolution with an explicit disambiguation step.

use super::{attendance, stats, students, Ctx, FlowResult, Step};
use crate::dialogue::input::{self, NameMatch};
use crate::dialogue::reply::Reply;
use crate::dialogue::state::{FlowState, NameTarget};
use crate::model::Student;
use crate::store;

fn candidate_list(candidates: &[Student]) -> String {
    candidates
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn on_surname(ctx: &Ctx<'_>, target: NameTarget, text: &str) -> FlowResult {
    let surname = text.trim();
    if surname.is_empty() {
        return Ok(Step::stay(Reply::text(
            "The surname can't be empty. Enter it again:",
        )));
    }
    let roster = store::list_students(ctx.conn)?;
    match input::match_surname(&roster, surname) {
        NameMatch::None => Ok(Step::stay(Reply::text(
            "No student with that surname. Enter the correct surname:",
        ))),
        NameMatch::One(student) => resolved(ctx, target, student),
        NameMatch::Many(candidates) => Ok(Step::goto(
            Reply::text(format!(
                "Several students match. Enter the full name:\n{}",
                candidate_list(&candidates)
            )),
            FlowState::FullName { target, candidates },
        )),
    }
}

pub fn on_full_name(
    ctx: &Ctx<'_>,
    target: NameTarget,
    candidates: &[Student],
    text: &str,
) -> FlowResult {
    match input::match_full_name(candidates, text) {
        Some(student) => resolved(ctx, target, student.clone()),
        None => Ok(Step::stay(Reply::text(format!(
            "Full name not found. Enter one of:\n{}",
            candidate_list(candidates)
        )))),
    }
}

fn resolved(ctx: &Ctx<'_>, target: NameTarget, student: Student) -> FlowResult {
    match target {
        NameTarget::Remove => students::remove(ctx, &student),
        NameTarget::Headman => students::appoint_headman(ctx, &student),
        NameTarget::EditMark { date, lesson } => {
            Ok(attendance::ask_edit_status(date, lesson, student))
        }
        NameTarget::Stats => stats::single_student(ctx, &student),
    }
}
