use std::fs;

use super::{ToolContext, ToolOutput, str_arg, usize_arg};
use crate::core::text::truncate_chars;
use crate::core::types::ToolArgs;

pub(super) const TRUNCATION_NOTICE: &str = "\n\n... (truncated)";

pub(super) fn run(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    let rel = str_arg(args, &["path", "file"]).unwrap_or_default();
    let max_chars = usize_arg(args, "max_chars", ctx.settings.read_file_max_chars);

    let Some(target) = ctx.jail.resolve(&rel).filter(|path| path.is_file()) else {
        return ToolOutput::failure(format!(
            "Chad tried to read_file '{rel}' but it does not exist, is not a file, \
             or is outside the project jail."
        ));
    };

    let bytes = match fs::read(&target) {
        Ok(bytes) => bytes,
        Err(err) => {
            return ToolOutput::failure(format!(
                "Chad tried to read_file '{rel}' but it could not be read: {err}"
            ));
        }
    };
    let Ok(text) = String::from_utf8(bytes) else {
        return ToolOutput::failure(format!(
            "Chad tried to read_file '{rel}' but it is not UTF-8 text."
        ));
    };

    let (kept, truncated) = truncate_chars(&text, max_chars);
    let mut result = kept.to_string();
    if truncated {
        result.push_str(TRUNCATION_NOTICE);
    }
    ToolOutput::new(
        result,
        format!("Chad read_file '{rel}' (up to {max_chars} chars)."),
    )
}
