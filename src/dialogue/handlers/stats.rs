use std::fmt::Write as _;

use super::{about_student, Ctx, FlowResult, Step, EMPTY_ROSTER};
use crate::calc::{format_percent, group_summary};
use crate::dialogue::input::{STATS_GROUP, STATS_STUDENT};
use crate::dialogue::reply::Reply;
use crate::dialogue::state::FlowState;
use crate::model::Student;
use crate::store;

use super::students::NOT_SET;

pub fn begin() -> Step {
    Step::goto(
        Reply::text("Choose the statistics type:").with_buttons([[STATS_GROUP], [STATS_STUDENT]]),
        FlowState::StatsMode,
    )
}

pub fn on_mode(ctx: &Ctx<'_>, text: &str) -> FlowResult {
    match text.trim() {
        STATS_GROUP => group_report(ctx),
        STATS_STUDENT => Ok(Step::goto(
            Reply::text("Enter the student's surname:").remove_keyboard(),
            FlowState::StatsSurname,
        )),
        _ => Ok(Step::stay(Reply::text("Choose one of the buttons!"))),
    }
}

fn group_report(ctx: &Ctx<'_>) -> FlowResult {
    let group = store::group_name(ctx.conn)?;
    let group = group.as_deref().unwrap_or(NOT_SET);
    let rows = store::student_tallies(ctx.conn)?;
    if rows.is_empty() {
        return Ok(Step::done(
            Reply::text(format!("Group: {group}\n{EMPTY_ROSTER}")).remove_keyboard(),
        ));
    }

    let summary = group_summary(&rows);
    let mut out = format!("Attendance statistics for group: {group}\n\n");

    if summary.most_absent.is_empty() {
        out.push_str("Nobody has missed a lesson yet.\n");
    } else {
        out.push_str("Missed the most lessons:\n");
        for r in &summary.most_absent {
            let _ = writeln!(out, "- {}: {} absences", r.student.label(), summary.max_absent);
        }
    }

    if summary.no_absences.is_empty() {
        out.push_str("\nNo students without absences (or no data yet).\n");
    } else {
        out.push_str("\nNo absences:\n");
        for r in &summary.no_absences {
            let _ = writeln!(out, "- {}", r.student.label());
        }
    }

    out.push_str("\nAttendance rate:\n");
    for r in &rows {
        let _ = writeln!(
            out,
            "- {}: {} ({} lessons)",
            r.student.label(),
            format_percent(r.tally.percent()),
            r.tally.total()
        );
    }

    Ok(Step::done(
        Reply::text(out.trim_end().to_string()).remove_keyboard(),
    ))
}

pub fn single_student(ctx: &Ctx<'_>, student: &Student) -> FlowResult {
    let group = store::group_name(ctx.conn)?;
    let group = group.as_deref().unwrap_or(NOT_SET);
    let row = store::student_tally(ctx.conn, student.id).map_err(about_student(student))?;
    let t = row.tally;
    let text = format!(
        "Statistics for {} (group: {group}):\n\
         Total lessons: {}\n\
         Present: {}\n\
         Absent: {}\n\
         Attendance rate: {}",
        row.student.label(),
        t.total(),
        t.present,
        t.absent,
        format_percent(t.percent())
    );
    Ok(Step::done(Reply::text(text).remove_keyboard()))
}
