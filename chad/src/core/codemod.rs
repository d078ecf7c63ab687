//! Content computation for codemod edits.
//!
//! Every function here is a pure transform from `(target path, original text,
//! edit content)` to the text that should end up on disk. The executor in
//! [`crate::io::executor`] owns the jail check, existence policy, and I/O.
//!
//! `original` is always newline-normalized by the caller, so a result equal to
//! `original` means the edit is a no-op.

use std::path::Path;

use crate::core::text::{
    contains_suspicious_control_chars, detect_comment_prefix, is_python_path,
    normalize_newlines, strip_suspicious_control_chars,
};
use crate::core::types::EditOperation;

/// Meta-narration the planner sometimes leaves in rewritten Python sources.
pub const PLACEHOLDER_MARKER: &str = "rest of code unchanged";

pub const REASON_MISSING_FIELDS: &str = "missing file or operation in edit";
pub const REASON_JAIL_ESCAPE: &str = "target path escapes project jail";
pub const REASON_MISSING_FILE: &str = "target file does not exist on disk";

pub const MESSAGE_MODIFIED: &str = "Chad executed Bob's plan and modified files.";
pub const MESSAGE_ALL_SKIPPED: &str = "Chad saw edits in the plan but skipped all of them; \
     check edit_logs in the exec report for reasons.";
pub const MESSAGE_NO_EDITS: &str = "Chad did not modify any files (no edits in plan).";

pub fn unknown_operation_reason(operation: &str) -> String {
    format!("unknown operation '{operation}'")
}

/// Text to write for one edit, plus the reasons to log for each outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedEdit {
    pub text: String,
    /// Suspicious control characters were removed from `text`.
    pub stripped_control_chars: bool,
    pub warning_reason: &'static str,
    pub noop_reason: &'static str,
    pub success_reason: &'static str,
}

impl ComputedEdit {
    pub fn is_noop(&self, original: &str) -> bool {
        self.text == original
    }
}

/// Compute the post-edit text for a known operation.
///
/// Returns `None` for [`EditOperation::Unknown`].
pub fn compute_edit(
    operation: &EditOperation,
    path: &Path,
    original: &str,
    content: &str,
) -> Option<ComputedEdit> {
    let computed = match operation {
        EditOperation::Overwrite => overwrite(path, original, content),
        EditOperation::Append => append(original, content),
        EditOperation::PrependComment => prepend_comment(path, original, content),
        EditOperation::Unknown(_) => return None,
    };
    Some(computed)
}

/// Final report message for a codemod batch.
pub fn codemod_message(touched: usize, requested: usize) -> &'static str {
    if touched > 0 {
        MESSAGE_MODIFIED
    } else if requested > 0 {
        MESSAGE_ALL_SKIPPED
    } else {
        MESSAGE_NO_EDITS
    }
}

fn overwrite(path: &Path, original: &str, content: &str) -> ComputedEdit {
    let (mut text, mut stripped) = clean(normalize_newlines(content));
    if is_python_path(path) {
        text = drop_placeholder_lines(&text);
        // Restored lines come from the original and may carry control chars.
        let (restored, restored_stripped) = clean(restore_unicode_lines(original, &text));
        text = restored;
        stripped |= restored_stripped;
    }
    ComputedEdit {
        text,
        stripped_control_chars: stripped,
        warning_reason: "new content contained suspicious control characters which were stripped",
        noop_reason: "new content is identical to existing file",
        success_reason: "file overwritten with new content",
    }
}

fn append(original: &str, content: &str) -> ComputedEdit {
    let block = strip_suspicious_control_chars(&normalize_newlines(content));
    // Leading indentation is part of the block; only trailing space is loose.
    let tail = block.trim_end();
    let base = original.trim_end();
    let raw = if tail.trim_start().is_empty() || ends_with_line_block(base, tail) {
        original.to_string()
    } else {
        normalize_newlines(&format!("{base}\n\n{content}\n"))
    };
    let (text, stripped) = clean(raw);
    ComputedEdit {
        text,
        stripped_control_chars: stripped,
        warning_reason: RESULT_WARNING,
        noop_reason: "append produced no effective change",
        success_reason: "content appended to bottom of file",
    }
}

fn prepend_comment(path: &Path, original: &str, content: &str) -> ComputedEdit {
    let block = strip_suspicious_control_chars(&normalize_newlines(content));
    let (raw, success_reason) = if is_python_path(path) && is_docstring_block(content) {
        (prepend_docstring(original, content, block.trim_end()), DOCSTRING_SUCCESS)
    } else {
        let prefix = detect_comment_prefix(path);
        let header = format!("{prefix}{}", block.trim_end());
        let raw = if starts_with_line_block(original, &header) {
            original.to_string()
        } else {
            normalize_newlines(&format!("{prefix}{content}\n\n{original}"))
        };
        (raw, "comment line prepended to file")
    };
    let (text, stripped) = clean(raw);
    ComputedEdit {
        text,
        stripped_control_chars: stripped,
        warning_reason: RESULT_WARNING,
        noop_reason: "prepend produced no effective change",
        success_reason,
    }
}

const RESULT_WARNING: &str =
    "resulting content contained suspicious control characters which were stripped";
const DOCSTRING_SUCCESS: &str = "docstring-style block prepended to Python file";

/// Insert a docstring block, keeping a leading `#!` line first.
fn prepend_docstring(original: &str, content: &str, block: &str) -> String {
    match original.split_once('\n') {
        Some((first, rest)) if first.starts_with("#!") => {
            if starts_with_line_block(rest.trim_start_matches('\n'), block) {
                return original.to_string();
            }
            normalize_newlines(&format!("{first}\n\n{content}\n\n{rest}"))
        }
        None if original.starts_with("#!") => {
            normalize_newlines(&format!("{original}\n\n{content}\n\n"))
        }
        _ => {
            if starts_with_line_block(original, block) {
                return original.to_string();
            }
            normalize_newlines(&format!("{content}\n\n{original}"))
        }
    }
}

fn is_docstring_block(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")
}

fn clean(text: String) -> (String, bool) {
    if contains_suspicious_control_chars(&text) {
        (strip_suspicious_control_chars(&text), true)
    } else {
        (text, false)
    }
}

fn drop_placeholder_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.contains(PLACEHOLDER_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Put back original lines whose non-ASCII characters vanished in the rewrite.
///
/// Lines are aligned by index up to the shorter of the two texts. This
/// assumes the rewrite is close to an identity transform and prefers the old
/// line whenever Unicode disappears from it.
fn restore_unicode_lines(original: &str, new_text: &str) -> String {
    let old_lines: Vec<&str> = original.split('\n').collect();
    let mut new_lines: Vec<&str> = new_text.split('\n').collect();
    for (old_line, new_line) in old_lines.iter().zip(new_lines.iter_mut()) {
        if !old_line.is_ascii() && new_line.is_ascii() {
            *new_line = *old_line;
        }
    }
    new_lines.join("\n")
}

/// `text` ends with `block`, and `block` starts at a line boundary.
fn ends_with_line_block(text: &str, block: &str) -> bool {
    match text.strip_suffix(block) {
        Some(head) => head.is_empty() || head.ends_with('\n'),
        None => false,
    }
}

/// `text` starts with `block`, and `block` ends at a line boundary.
fn starts_with_line_block(text: &str, block: &str) -> bool {
    if block.is_empty() {
        return false;
    }
    match text.strip_prefix(block) {
        Some(rest) => rest.is_empty() || rest.starts_with('\n'),
        None => false,
    }
}
