//! Plan, edit, and report types shared by the executor and the CLI.
//!
//! Wire shapes mirror the JSON the planner emits and the artifacts written to
//! the queue directory. In-memory shapes are typed so that every branch over
//! task kinds and edit operations is checked exhaustively.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form tool arguments as emitted by the planner.
pub type ToolArgs = Map<String, Value>;

/// Placeholder rendered in edit logs when an edit omits a field.
pub const MISSING_FIELD: &str = "(none)";

/// Identifier shared by the plan, report, and scratch artifacts of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId {
    /// Zero-padded sequence number (e.g. `00001`).
    pub id: String,
    /// Calendar date (`YYYY-MM-DD`).
    pub date: String,
}

impl MessageId {
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
        }
    }

    /// Artifact basename: `<id>_<date>`.
    pub fn base(&self) -> String {
        format!("{}_{}", self.id, self.date)
    }
}

/// Kind of file mutation requested by an [`Edit`].
///
/// Unrecognized wire names are kept verbatim in `Unknown` so the executor can
/// report them instead of failing deserialization of the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EditOperation {
    /// Replace the whole file (creating it when missing).
    Overwrite,
    /// Append a block at the bottom (creating the file when missing).
    Append,
    /// Insert a comment or docstring block at the top of an existing file.
    PrependComment,
    Unknown(String),
}

impl EditOperation {
    pub fn as_str(&self) -> &str {
        match self {
            EditOperation::Overwrite => "create_or_overwrite_file",
            EditOperation::Append => "append_to_bottom",
            EditOperation::PrependComment => "prepend_comment",
            EditOperation::Unknown(raw) => raw,
        }
    }
}

impl From<String> for EditOperation {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "create_or_overwrite_file" | "overwrite" => EditOperation::Overwrite,
            "append_to_bottom" | "append" => EditOperation::Append,
            "prepend_comment" => EditOperation::PrependComment,
            _ => EditOperation::Unknown(raw),
        }
    }
}

impl From<EditOperation> for String {
    fn from(op: EditOperation) -> Self {
        op.as_str().to_string()
    }
}

/// One planned mutation of a file inside the jail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Jail-relative target path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<EditOperation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl Edit {
    pub fn new(file: &str, operation: &str, content: &str) -> Self {
        Self {
            file: Some(file.to_string()),
            operation: Some(EditOperation::from(operation.to_string())),
            content: content.to_string(),
        }
    }

    /// Target path and operation, or `None` when either is missing or blank.
    pub fn target(&self) -> Option<(&str, &EditOperation)> {
        let file = self.file.as_deref().filter(|f| !f.is_empty())?;
        let operation = self
            .operation
            .as_ref()
            .filter(|op| !matches!(op, EditOperation::Unknown(raw) if raw.is_empty()))?;
        Some((file, operation))
    }
}

/// Tool invocation requested by a `tool` task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: ToolArgs,
}

impl ToolCall {
    pub fn new(name: &str, args: ToolArgs) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }

    fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.args.is_empty()
    }
}

/// Unit of work described by a plan.
///
/// On the wire this is a flat object (`type`, `summary`, `analysis_file`,
/// `edits`, `tool`) where fields irrelevant to `type` hold empty placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskWire", into = "TaskWire")]
pub enum Task {
    Chat {
        summary: String,
    },
    Analysis {
        summary: String,
        analysis_file: String,
    },
    Tool {
        summary: String,
        tool: ToolCall,
    },
    Codemod {
        summary: String,
        edits: Vec<Edit>,
    },
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Chat { .. } => "chat",
            Task::Analysis { .. } => "analysis",
            Task::Tool { .. } => "tool",
            Task::Codemod { .. } => "codemod",
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Task::Chat { summary }
            | Task::Analysis { summary, .. }
            | Task::Tool { summary, .. }
            | Task::Codemod { summary, .. } => summary,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TaskWire {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    analysis_file: Option<String>,
    #[serde(default)]
    edits: Option<Vec<Edit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool: Option<ToolCall>,
}

impl From<TaskWire> for Task {
    /// Missing `type` means analysis; a populated `tool` object wins over
    /// any other declared type.
    fn from(wire: TaskWire) -> Self {
        let summary = wire.summary.unwrap_or_default();
        let tool = wire.tool.filter(|tool| !tool.is_empty());
        let kind = wire.kind.unwrap_or_else(|| "analysis".to_string());
        match (kind.as_str(), tool) {
            (_, Some(tool)) => Task::Tool { summary, tool },
            ("tool", None) => Task::Tool {
                summary,
                tool: ToolCall::default(),
            },
            ("codemod", None) => Task::Codemod {
                summary,
                edits: wire.edits.unwrap_or_default(),
            },
            ("chat", None) => Task::Chat { summary },
            (_, None) => Task::Analysis {
                summary,
                analysis_file: wire.analysis_file.unwrap_or_default(),
            },
        }
    }
}

impl From<Task> for TaskWire {
    fn from(task: Task) -> Self {
        let kind = Some(task.kind().to_string());
        let mut wire = TaskWire {
            kind,
            analysis_file: Some(String::new()),
            edits: Some(Vec::new()),
            ..TaskWire::default()
        };
        match task {
            Task::Chat { summary } => wire.summary = Some(summary),
            Task::Analysis {
                summary,
                analysis_file,
            } => {
                wire.summary = Some(summary);
                wire.analysis_file = Some(analysis_file);
            }
            Task::Tool { summary, tool } => {
                wire.summary = Some(summary);
                wire.tool = Some(tool);
            }
            Task::Codemod { summary, edits } => {
                wire.summary = Some(summary);
                wire.edits = Some(edits);
            }
        }
        wire
    }
}

/// Structured planner output handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "plan_actor")]
    pub actor: String,
    #[serde(default = "plan_kind")]
    pub kind: String,
    #[serde(default)]
    pub raw_user_text: String,
    pub task: Task,
}

impl Plan {
    pub fn new(task: Task) -> Self {
        Self {
            id: String::new(),
            date: String::new(),
            created_at: String::new(),
            actor: plan_actor(),
            kind: plan_kind(),
            raw_user_text: String::new(),
            task,
        }
    }

    /// Message id carried by the plan, if both parts are present and safe to
    /// use as an artifact file name.
    ///
    /// The id must be all digits and the date must be `YYYY-MM-DD`.
    pub fn message_id(&self) -> Option<MessageId> {
        static ID: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^\d+$").expect("id regex should compile"));
        static DATE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex should compile")
        });
        let (id, date) = (self.id.trim(), self.date.trim());
        if !ID.is_match(id) || !DATE.is_match(date) {
            return None;
        }
        Some(MessageId::new(id, date))
    }
}

fn plan_actor() -> String {
    "bob".to_string()
}

fn plan_kind() -> String {
    "plan".to_string()
}

/// One audit line per edit attempt (applied, skipped, or failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLogEntry {
    pub file: String,
    pub operation: String,
    pub reason: String,
}

impl EditLogEntry {
    pub fn new(file: Option<&str>, operation: Option<&str>, reason: impl Into<String>) -> Self {
        let or_missing = |value: Option<&str>| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or(MISSING_FIELD)
                .to_string()
        };
        Self {
            file: or_missing(file),
            operation: or_missing(operation),
            reason: reason.into(),
        }
    }
}

/// Task-specific part of an [`ExecutionReport`], flattened into the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportBody {
    Codemod {
        edits_requested: usize,
        edit_logs: Vec<EditLogEntry>,
    },
    Tool {
        tool_name: String,
        tool_args: ToolArgs,
        tool_result: String,
    },
    Analysis {
        analysis_file: Option<String>,
        analysis_snippet: String,
    },
}

/// Result of executing one plan. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub id: String,
    pub date: String,
    pub created_at: String,
    pub actor: String,
    pub kind: String,
    pub status: String,
    /// Jail-relative paths that were actually written.
    pub touched_files: Vec<String>,
    #[serde(flatten)]
    pub body: ReportBody,
    pub message: String,
}

impl ExecutionReport {
    pub fn new(
        message_id: &MessageId,
        created_at: &str,
        touched_files: Vec<String>,
        body: ReportBody,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: message_id.id.clone(),
            date: message_id.date.clone(),
            created_at: created_at.to_string(),
            actor: "chad".to_string(),
            kind: "exec_result".to_string(),
            status: "success".to_string(),
            touched_files,
            body,
            message: message.into(),
        }
    }

    pub fn edit_logs(&self) -> &[EditLogEntry] {
        match &self.body {
            ReportBody::Codemod { edit_logs, .. } => edit_logs,
            ReportBody::Tool { .. } | ReportBody::Analysis { .. } => &[],
        }
    }

    /// True when a codemod asked for edits but none were written.
    pub fn skipped_all_edits(&self) -> bool {
        match &self.body {
            ReportBody::Codemod {
                edits_requested, ..
            } => *edits_requested > 0 && self.touched_files.is_empty(),
            ReportBody::Tool { .. } | ReportBody::Analysis { .. } => false,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn carried_message_id_must_be_digits_and_a_date() {
        let mut plan = Plan::new(Task::Chat {
            summary: String::new(),
        });
        plan.id = " 00042 ".to_string();
        plan.date = "2025-01-01".to_string();
        assert_eq!(
            plan.message_id().map(|id| id.base()),
            Some("00042_2025-01-01".to_string())
        );

        for (id, date) in [
            ("../../../escaped", "2025-01-01"),
            ("00042", "d"),
            ("00042", "2025-01-01/../x"),
            ("", "2025-01-01"),
            ("1/2", "2025-01-01"),
        ] {
            plan.id = id.to_string();
            plan.date = date.to_string();
            assert_eq!(plan.message_id(), None, "{id:?} {date:?}");
        }
    }

    #[test]
    fn edit_operation_accepts_aliases_and_keeps_unknown_names() {
        let ops: Vec<EditOperation> = serde_json::from_value(json!([
            "create_or_overwrite_file",
            "overwrite",
            "append_to_bottom",
            "prepend_comment",
            "delete_file"
        ]))
        .expect("parse ops");
        assert_eq!(
            ops,
            vec![
                EditOperation::Overwrite,
                EditOperation::Overwrite,
                EditOperation::Append,
                EditOperation::PrependComment,
                EditOperation::Unknown("delete_file".to_string()),
            ]
        );
        assert_eq!(
            serde_json::to_value(&ops[4]).expect("serialize"),
            json!("delete_file")
        );
    }

    #[test]
    fn edit_without_file_or_operation_has_no_target() {
        let edit: Edit = serde_json::from_value(json!({"operation": "append_to_bottom"}))
            .expect("parse edit");
        assert!(edit.target().is_none());
        assert_eq!(edit.content, "");

        let blank: Edit = serde_json::from_value(json!({"file": "a.txt", "operation": ""}))
            .expect("parse edit");
        assert!(blank.target().is_none());

        let null_content: Edit =
            serde_json::from_value(json!({"file": "a.txt", "operation": "append", "content": null}))
                .expect("parse edit");
        assert_eq!(null_content.content, "");
        assert!(null_content.target().is_some());
    }

    #[test]
    fn task_defaults_to_analysis_when_type_missing() {
        let task: Task =
            serde_json::from_value(json!({"analysis_file": "README.md"})).expect("parse task");
        assert_eq!(
            task,
            Task::Analysis {
                summary: String::new(),
                analysis_file: "README.md".to_string(),
            }
        );
    }

    #[test]
    fn populated_tool_object_wins_over_declared_type() {
        let task: Task = serde_json::from_value(json!({
            "type": "analysis",
            "summary": "time",
            "tool": {"name": "get_current_datetime", "args": {}}
        }))
        .expect("parse task");
        assert_eq!(task.kind(), "tool");
    }

    #[test]
    fn codemod_plan_round_trips_through_wire_shape() {
        let plan = Plan::new(Task::Codemod {
            summary: "add header".to_string(),
            edits: vec![Edit::new("a.py", "prepend_comment", "header")],
        });
        let value = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(value["task"]["type"], "codemod");
        assert_eq!(value["task"]["analysis_file"], "");
        assert_eq!(value["actor"], "bob");
        let parsed: Plan = serde_json::from_value(value).expect("parse");
        assert_eq!(parsed, plan);
    }

    #[test]
    fn report_body_flattens_into_report_object() {
        let report = ExecutionReport::new(
            &MessageId::new("00001", "2025-11-23"),
            "2025-11-23T10:00:00Z",
            vec!["a.txt".to_string()],
            ReportBody::Codemod {
                edits_requested: 1,
                edit_logs: vec![EditLogEntry::new(Some("a.txt"), None, "ok")],
            },
            "done",
        );
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["edits_requested"], 1);
        assert_eq!(value["edit_logs"][0]["operation"], MISSING_FIELD);
        assert_eq!(value["kind"], "exec_result");
        let parsed: ExecutionReport = serde_json::from_value(value).expect("parse");
        assert_eq!(parsed, report);
    }
}
