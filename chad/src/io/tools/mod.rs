//! Tool dispatcher: a static registry of built-in tools.
//!
//! Handlers never return errors. Every failure (bad arguments, jail
//! rejection, I/O, SMTP) is turned into a human-readable message so a tool
//! task always produces a report.

mod datetime;
mod email;
mod list_files;
mod notes;
mod read_file;
mod script;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::types::{ToolArgs, ToolCall};
use crate::io::config::ToolSettings;
use crate::io::jail::Jail;
use crate::io::mail::{Mailer, SmtpSettings};

/// Everything a handler may touch.
pub struct ToolContext<'a> {
    pub jail: &'a Jail,
    pub notes_dir: &'a Path,
    pub settings: &'a ToolSettings,
    pub smtp: &'a SmtpSettings,
    pub mailer: &'a dyn Mailer,
}

/// Handler result: `result` is the tool payload, `message` the summary line
/// that ends up in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub result: String,
    pub message: String,
}

impl ToolOutput {
    pub fn new(result: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            message: message.into(),
        }
    }

    /// Failure with no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }
}

type ToolHandler = fn(&ToolArgs, &ToolContext<'_>) -> ToolOutput;

struct ToolSpec {
    description: &'static str,
    handler: ToolHandler,
}

/// Name to handler table, iterated in name order.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    /// Registry with every built-in tool.
    pub fn builtin() -> Self {
        let mut tools: BTreeMap<&'static str, ToolSpec> = BTreeMap::new();
        let mut register = |name: &'static str, description: &'static str, handler: ToolHandler| {
            tools.insert(name, ToolSpec { description, handler });
        };
        register(
            "get_current_datetime",
            "Report the local system date and time.",
            datetime::run,
        );
        register(
            "list_files",
            "List files under a jail path (args: path, recursive, max_entries).",
            list_files::run,
        );
        register(
            "read_file",
            "Read a UTF-8 text file inside the jail (args: path, max_chars).",
            read_file::run,
        );
        register(
            "create_markdown_note",
            "Create or replace a markdown note (args: title, content).",
            notes::create,
        );
        register(
            "append_to_markdown_note",
            "Append to a markdown note, creating it if missing (args: title, content).",
            notes::append,
        );
        register(
            "send_email",
            "Email the configured recipient (args: subject, body, attachments). \
             The recipient always comes from SMTP_TO / SMTP_TEST_TO.",
            email::run,
        );
        register(
            "run_python_script",
            "Run a script inside the jail (args: path, args, timeout).",
            script::run,
        );
        Self { tools }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// `(name, description)` pairs in name order.
    pub fn describe(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.tools.iter().map(|(name, spec)| (*name, spec.description))
    }

    /// Run `call`; unknown names produce an empty result and an explanatory
    /// message.
    #[instrument(skip_all, fields(tool = %call.name))]
    pub fn dispatch(&self, call: &ToolCall, ctx: &ToolContext<'_>) -> ToolOutput {
        let name = call.name.trim();
        let Some(spec) = self.tools.get(name) else {
            warn!("tool not registered");
            return ToolOutput::failure(format!(
                "Chad was asked to run tool '{name}', but it is not registered. \
                 No tool was executed."
            ));
        };
        let output = (spec.handler)(&call.args, ctx);
        info!(result_chars = output.result.chars().count(), "tool finished");
        output
    }
}

/// First non-blank string among `keys`. Numbers and booleans are rendered
/// as text; other JSON values are ignored.
fn str_arg(args: &ToolArgs, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match args.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Non-negative integer from a number or numeric string, else `default`.
fn usize_arg(args: &ToolArgs, key: &str, default: usize) -> usize {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(default)
}

/// Truthiness of a flag the way a loosely typed planner writes it.
fn bool_arg(args: &ToolArgs, key: &str) -> bool {
    match args.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    }
}

/// List of strings; scalars inside the list are rendered as text.
fn string_list_arg(args: &ToolArgs, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ToolHarness, tool_args};
    use serde_json::json;

    #[test]
    fn builtin_registry_lists_tools_in_name_order() {
        let registry = ToolRegistry::builtin();
        let names: Vec<_> = registry.describe().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "append_to_markdown_note",
                "create_markdown_note",
                "get_current_datetime",
                "list_files",
                "read_file",
                "run_python_script",
                "send_email",
            ]
        );
        assert!(registry.contains("read_file"));
        assert!(!registry.contains("delete_everything"));
    }

    #[test]
    fn unknown_tool_is_reported_not_executed() {
        let harness = ToolHarness::new();
        let output = harness.run("rm_rf", json!({"path": "."}));
        assert_eq!(output.result, "");
        assert_eq!(
            output.message,
            "Chad was asked to run tool 'rm_rf', but it is not registered. No tool was executed."
        );
    }

    #[test]
    fn argument_helpers_accept_loose_types() {
        let args = tool_args(json!({
            "path": "  ",
            "file": "a.txt",
            "max": "12",
            "neg": -3,
            "flag": "yes",
            "num_flag": 0,
            "list": ["a", 2, null],
        }));
        assert_eq!(str_arg(&args, &["path", "file"]), Some("a.txt".to_string()));
        assert_eq!(str_arg(&args, &["missing"]), None);
        assert_eq!(usize_arg(&args, "max", 5), 12);
        assert_eq!(usize_arg(&args, "neg", 5), 5);
        assert_eq!(usize_arg(&args, "missing", 5), 5);
        assert!(bool_arg(&args, "flag"));
        assert!(!bool_arg(&args, "num_flag"));
        assert_eq!(string_list_arg(&args, "list"), vec!["a", "2"]);
        assert!(string_list_arg(&args, "missing").is_empty());
    }
}
