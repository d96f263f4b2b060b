//! Date and lesson selection shared by marking, editing and listing.

use super::{attendance, Ctx, FlowResult, Step};
use crate::dialogue::input::{self, OTHER_DATE, TODAY_PREFIX};
use crate::dialogue::reply::Reply;
use crate::dialogue::state::{FlowState, LessonPurpose};
use crate::model::{Lesson, LessonDate};

const CUSTOM_DATE_PROMPT: &str = "Enter the date as day.month (for example, 23.03):";
const CUSTOM_DATE_RETRY: &str =
    "Wrong format. Enter the date as day.month (for example, 23.03):";

pub fn begin(ctx: &Ctx<'_>, purpose: LessonPurpose) -> Step {
    let prompt = match purpose {
        LessonPurpose::Mark => "Choose the date to take attendance for:",
        LessonPurpose::EditMark => "Choose the date of the mark to correct:",
        LessonPurpose::ListMark => "Choose the date to show attendance for:",
    };
    Step::goto(
        Reply::text(prompt).with_buttons(input::date_buttons(ctx.today)),
        FlowState::PickDate { purpose },
    )
}

fn ask_lesson(purpose: LessonPurpose, date: LessonDate) -> Step {
    Step::goto(
        Reply::text("Choose the lesson number:").with_buttons(input::lesson_buttons()),
        FlowState::PickLesson { purpose, date },
    )
}

pub fn on_date_choice(ctx: &Ctx<'_>, purpose: LessonPurpose, text: &str) -> Step {
    let text = text.trim();
    if text.starts_with(TODAY_PREFIX) {
        ask_lesson(purpose, ctx.today)
    } else if text == OTHER_DATE {
        Step::goto(
            Reply::text(CUSTOM_DATE_PROMPT).remove_keyboard(),
            FlowState::PickCustomDate { purpose },
        )
    } else {
        Step::stay(Reply::text("Choose one of the buttons!"))
    }
}

pub fn on_custom_date(ctx: &Ctx<'_>, purpose: LessonPurpose, text: &str) -> Step {
    match input::parse_custom_date(text, ctx.today.year()) {
        Some(date) => ask_lesson(purpose, date),
        None => Step::stay(Reply::text(CUSTOM_DATE_RETRY)),
    }
}

pub fn on_lesson(
    ctx: &Ctx<'_>,
    purpose: LessonPurpose,
    date: LessonDate,
    text: &str,
) -> FlowResult {
    let Some(lesson) = input::parse_lesson(text) else {
        return Ok(Step::stay(Reply::text(
            "Choose the lesson number with the buttons!",
        )));
    };
    lesson_chosen(ctx, purpose, date, lesson)
}

fn lesson_chosen(
    ctx: &Ctx<'_>,
    purpose: LessonPurpose,
    date: LessonDate,
    lesson: Lesson,
) -> FlowResult {
    match purpose {
        LessonPurpose::Mark => attendance::begin_roll_call(ctx, date, lesson),
        LessonPurpose::EditMark => attendance::ask_edit_student(ctx, date, lesson),
        LessonPurpose::ListMark => attendance::list_lesson(ctx, date, lesson),
    }
}
