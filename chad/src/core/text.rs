//! Text normalization applied to every piece of content before it is compared
//! or written.
//!
//! All helpers operate on decoded `char`s, so multi-byte UTF-8 text is never
//! split or altered by the control-character checks.

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

/// Convert `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// True for control characters below U+0020 other than newline, carriage
/// return, and tab.
fn is_suspicious_control(ch: char) -> bool {
    (ch as u32) < 0x20 && !matches!(ch, '\n' | '\r' | '\t')
}

pub fn contains_suspicious_control_chars(text: &str) -> bool {
    text.chars().any(is_suspicious_control)
}

/// Remove suspicious control characters, leaving everything else untouched.
pub fn strip_suspicious_control_chars(text: &str) -> String {
    text.chars().filter(|ch| !is_suspicious_control(*ch)).collect()
}

/// Guess a single-line comment token from the file extension.
///
/// Unknown or missing extensions fall back to `"# "`.
pub fn detect_comment_prefix(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "py" | "sh" => "# ",
        "js" | "ts" | "jsx" | "tsx" | "c" | "cpp" | "h" | "php" => "// ",
        _ => "# ",
    }
}

/// True when `path` has a `.py` extension (case-insensitive).
pub fn is_python_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("py"))
}

/// Build a filename slug for a markdown note.
///
/// Alphanumerics are lowercased, everything else becomes `-`, runs of `-`
/// collapse, and an empty result falls back to `note-<timestamp>`.
pub fn slugify_for_markdown(title: &str, now: NaiveDateTime) -> String {
    static DASHES: LazyLock<Regex> =
        LazyLock::new(|| Regex::new("-{2,}").expect("dash regex should compile"));

    let mapped: String = title
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().collect::<String>()
            } else {
                "-".to_string()
            }
        })
        .collect();
    let collapsed = DASHES.replace_all(&mapped, "-");
    let slug = collapsed.trim_matches('-');
    if slug.is_empty() {
        return format!("note-{}", now.format("%Y%m%d-%H%M%S"));
    }
    slug.to_string()
}

/// Truncate to at most `max_chars` characters.
///
/// Returns the kept prefix and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 23)
            .and_then(|d| d.and_hms_opt(9, 5, 7))
            .expect("valid timestamp")
    }

    #[test]
    fn normalize_newlines_handles_crlf_and_lone_cr() {
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_newlines("\r\r\n"), "\n\n");
    }

    #[test]
    fn control_chars_are_detected_and_stripped() {
        let text = "tab\tok\nline\x0bvt\x0cff £ 😊\r";
        assert!(contains_suspicious_control_chars(text));
        let cleaned = strip_suspicious_control_chars(text);
        assert_eq!(cleaned, "tab\tok\nlinevtff £ 😊\r");
        assert!(!contains_suspicious_control_chars(&cleaned));
    }

    #[test]
    fn comment_prefix_follows_extension() {
        assert_eq!(detect_comment_prefix(Path::new("a.py")), "# ");
        assert_eq!(detect_comment_prefix(Path::new("run.sh")), "# ");
        assert_eq!(detect_comment_prefix(Path::new("src/app.TSX")), "// ");
        assert_eq!(detect_comment_prefix(Path::new("index.php")), "// ");
        assert_eq!(detect_comment_prefix(Path::new("Makefile")), "# ");
        assert_eq!(detect_comment_prefix(Path::new("notes.md")), "# ");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(
            slugify_for_markdown("  Meeting Notes: Q4!! ", fixed_now()),
            "meeting-notes-q4"
        );
        assert_eq!(slugify_for_markdown("Café déjà vu", fixed_now()), "café-déjà-vu");
    }

    #[test]
    fn slugify_falls_back_to_timestamp() {
        assert_eq!(
            slugify_for_markdown("!!!", fixed_now()),
            "note-20251123-090507"
        );
    }

    #[test]
    fn truncate_chars_is_unicode_safe() {
        assert_eq!(truncate_chars("£12.50", 3), ("£12", true));
        assert_eq!(truncate_chars("ok", 10), ("ok", false));
        assert_eq!(truncate_chars("abc", 3), ("abc", false));
    }
}
