//! Test-only fixtures: temporary jails, plan builders, and a recording mailer.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde_json::Value;
use tempfile::TempDir;

use crate::core::types::{Edit, Plan, Task, ToolArgs, ToolCall};
use crate::io::config::{DataDirs, ToolSettings};
use crate::io::jail::Jail;
use crate::io::mail::{Mailer, OutgoingEmail, SmtpSettings};
use crate::io::tools::{ToolContext, ToolOutput, ToolRegistry};

/// Temporary workspace with a `project/` jail and a sibling `data/` dir.
///
/// `outside/secret.txt` sits next to the jail so escape attempts have a real
/// target to hit.
pub struct TestJail {
    pub temp: TempDir,
    pub jail: Jail,
    pub dirs: DataDirs,
}

impl TestJail {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let project = temp.path().join("project");
        fs::create_dir_all(&project).expect("create project dir");
        fs::create_dir_all(temp.path().join("outside")).expect("create outside dir");
        fs::write(temp.path().join("outside/secret.txt"), "secret\n").expect("write secret");
        let jail = Jail::new(&project).expect("jail");
        let dirs = DataDirs::under(&temp.path().join("data"));
        Self { temp, jail, dirs }
    }

    pub fn root(&self) -> &Path {
        self.jail.root()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write raw bytes inside the jail, creating parent directories.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn outside_secret(&self) -> PathBuf {
        self.temp.path().join("outside/secret.txt")
    }
}

impl Default for TestJail {
    fn default() -> Self {
        Self::new()
    }
}

pub fn codemod_plan(edits: Vec<Edit>) -> Plan {
    Plan::new(Task::Codemod {
        summary: "apply edits".to_string(),
        edits,
    })
}

pub fn tool_plan(name: &str, args: Value) -> Plan {
    Plan::new(Task::Tool {
        summary: format!("run {name}"),
        tool: ToolCall::new(name, tool_args(args)),
    })
}

pub fn analysis_plan(analysis_file: &str) -> Plan {
    Plan::new(Task::Analysis {
        summary: "look at a file".to_string(),
        analysis_file: analysis_file.to_string(),
    })
}

/// Convert a `json!` object literal into tool arguments.
pub fn tool_args(value: Value) -> ToolArgs {
    match value {
        Value::Object(map) => map,
        Value::Null => ToolArgs::new(),
        other => panic!("tool args must be an object, got {other}"),
    }
}

/// Tool settings with small limits for fast tests.
pub fn test_tool_settings() -> ToolSettings {
    let mut settings = ToolSettings::default();
    settings.script.timeout_secs = 10;
    settings
}

/// SMTP settings that pass the tool's completeness checks.
pub fn complete_smtp() -> SmtpSettings {
    SmtpSettings::from_lookup(|key| match key {
        "SMTP_HOST" => Some("smtp.example.com".to_string()),
        "SMTP_PORT" => Some("587".to_string()),
        "SMTP_USERNAME" => Some("user@example.com".to_string()),
        "SMTP_PASSWORD" => Some("password123".to_string()),
        "SMTP_FROM" => Some("from@example.com".to_string()),
        "SMTP_TO" => Some("forced@example.com".to_string()),
        _ => None,
    })
}

/// Mailer that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: RefCell<Vec<OutgoingEmail>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailer whose every send fails with `error`.
    pub fn failing(error: &str) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_with: Some(error.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.borrow().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if let Some(error) = &self.fail_with {
            return Err(anyhow!("{error}"));
        }
        self.sent.borrow_mut().push(email.clone());
        Ok(())
    }
}

/// A [`TestJail`] plus everything a tool handler needs.
pub struct ToolHarness {
    pub fixture: TestJail,
    pub settings: ToolSettings,
    pub smtp: SmtpSettings,
    pub mailer: RecordingMailer,
    registry: ToolRegistry,
}

impl ToolHarness {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::new())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        Self {
            fixture: TestJail::new(),
            settings: test_tool_settings(),
            smtp: complete_smtp(),
            mailer,
            registry: ToolRegistry::builtin(),
        }
    }

    pub fn ctx(&self) -> ToolContext<'_> {
        ToolContext {
            jail: &self.fixture.jail,
            notes_dir: &self.fixture.dirs.notes,
            settings: &self.settings,
            smtp: &self.smtp,
            mailer: &self.mailer,
        }
    }

    /// Dispatch `name` with a `json!` object of arguments.
    pub fn run(&self, name: &str, args: Value) -> ToolOutput {
        self.registry
            .dispatch(&ToolCall::new(name, tool_args(args)), &self.ctx())
    }
}

impl Default for ToolHarness {
    fn default() -> Self {
        Self::new()
    }
}
