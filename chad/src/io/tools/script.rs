use std::process::Command;
use std::time::Duration;

use super::{ToolContext, ToolOutput, str_arg, string_list_arg, usize_arg};
use crate::core::types::ToolArgs;
use crate::io::process::run_command_with_timeout;

pub(super) fn run(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    let rel = str_arg(args, &["path"]).unwrap_or_default();
    let script_args = string_list_arg(args, "args");
    let timeout_secs = script_timeout(args, ctx.settings.script.timeout_secs);

    let Some(target) = ctx.jail.resolve(&rel).filter(|path| path.is_file()) else {
        return ToolOutput::failure(format!(
            "Chad tried to run_python_script '{rel}' but the file does not exist, \
             is not a file, or is outside the project jail."
        ));
    };

    let mut cmd = Command::new(&ctx.settings.script.interpreter);
    cmd.arg(&target).args(&script_args).current_dir(ctx.jail.root());
    let output = match run_command_with_timeout(
        cmd,
        Duration::from_secs(timeout_secs),
        ctx.settings.script.output_limit_bytes,
    ) {
        Ok(output) => output,
        Err(err) => {
            return ToolOutput::failure(format!(
                "Chad failed to run_python_script due to error: {err:#}"
            ));
        }
    };

    let code = output.exit_code();
    let result = format!(
        "Exit code: {code}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
        output.stdout_lossy(),
        output.stderr_lossy()
    );
    let message = if output.timed_out {
        format!("Chad ran run_python_script on '{rel}' but it timed out after {timeout_secs}s.")
    } else {
        format!("Chad ran run_python_script on '{rel}' with args {script_args:?} (exit code {code}).")
    };
    ToolOutput::new(result, message)
}

/// Requested timeout in seconds; zero or unusable values mean the default.
fn script_timeout(args: &ToolArgs, default_secs: u64) -> u64 {
    u64::try_from(usize_arg(args, "timeout", 0))
        .ok()
        .filter(|secs| *secs > 0)
        .unwrap_or(default_secs)
}
