use chrono::Local;

use super::{ToolContext, ToolOutput};
use crate::core::types::ToolArgs;

pub(super) fn run(_args: &ToolArgs, _ctx: &ToolContext<'_>) -> ToolOutput {
    let now = Local::now().format("%A, %d %B %Y, %H:%M:%S %Z (%z)");
    ToolOutput::new(
        format!("Local system date and time: {now}"),
        "Chad ran tool 'get_current_datetime' using the system clock.",
    )
}
