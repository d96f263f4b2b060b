use tracing::info;

use super::{Ctx, FlowResult, Step};
use crate::dialogue::input::{GROUP_CHANGE, GROUP_KEEP};
use crate::dialogue::reply::Reply;
use crate::dialogue::state::FlowState;
use crate::store;

pub fn begin(ctx: &Ctx<'_>) -> FlowResult {
    match store::group_name(ctx.conn)? {
        Some(current) => Ok(Step::goto(
            Reply::text(format!(
                "Current group name: {current}\nChange it or keep it?"
            ))
            .with_buttons([[GROUP_CHANGE], [GROUP_KEEP]]),
            FlowState::GroupChoice,
        )),
        None => Ok(Step::goto(
            Reply::text("Enter the group name:"),
            FlowState::GroupName,
        )),
    }
}

pub fn on_choice(ctx: &Ctx<'_>, text: &str) -> FlowResult {
    match text.trim() {
        GROUP_KEEP => {
            let current = store::group_name(ctx.conn)?.unwrap_or_default();
            Ok(Step::done(
                Reply::text(format!("The group name stays: {current}")).remove_keyboard(),
            ))
        }
        GROUP_CHANGE => Ok(Step::goto(
            Reply::text("Enter the new group name:").remove_keyboard(),
            FlowState::GroupName,
        )),
        _ => Ok(Step::stay(Reply::text("Choose one of the buttons!"))),
    }
}

pub fn on_name(ctx: &Ctx<'_>, text: &str) -> FlowResult {
    let name = text.trim();
    if name.is_empty() {
        return Ok(Step::stay(Reply::text(
            "The group name can't be empty. Enter it again:",
        )));
    }
    store::set_group_name(ctx.conn, name)?;
    info!(group = %name, "group name set");
    Ok(Step::done(
        Reply::text(format!("Group name set: {name}")).remove_keyboard(),
    ))
}
