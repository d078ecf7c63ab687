//! Orchestration for executing one plan.
//!
//! Dispatches on the task kind, then persists the scratch note and the
//! report. Per-edit and per-tool problems end up inside the report; only
//! artifact I/O can fail the call.

use std::fs;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::core::codemod::codemod_message;
use crate::core::text::truncate_chars;
use crate::core::types::{Edit, ExecutionReport, MessageId, Plan, ReportBody, Task, ToolCall};
use crate::io::artifacts::{ArtifactPaths, write_plan_artifact, write_report, write_scratch};
use crate::io::config::{ChadConfig, DataDirs};
use crate::io::executor::CodemodExecutor;
use crate::io::jail::Jail;
use crate::io::mail::{Mailer, SmtpSettings};
use crate::io::sequence::next_message_id;
use crate::io::store::FileStore;
use crate::io::tools::{ToolContext, ToolRegistry};

/// Everything needed to execute one plan.
pub struct ExecContext<'a, S: FileStore> {
    pub jail: &'a Jail,
    pub dirs: &'a DataDirs,
    pub message_id: MessageId,
    pub config: &'a ChadConfig,
    pub registry: &'a ToolRegistry,
    pub smtp: &'a SmtpSettings,
    pub mailer: &'a dyn Mailer,
    pub store: &'a S,
}

/// Give `plan` an id (allocating one from `seq.txt` when it has none),
/// stamp missing timestamps, and persist it to the queue.
pub fn admit_plan(plan: &mut Plan, dirs: &DataDirs, now: NaiveDateTime) -> Result<MessageId> {
    dirs.create_all()?;
    let message_id = match plan.message_id() {
        Some(id) => id,
        None => {
            if !plan.id.trim().is_empty() || !plan.date.trim().is_empty() {
                warn!(id = %plan.id, date = %plan.date, "ignoring malformed plan id");
            }
            next_message_id(&dirs.seq_file, now.date())?
        }
    };
    plan.id.clone_from(&message_id.id);
    plan.date.clone_from(&message_id.date);
    if plan.created_at.trim().is_empty() {
        plan.created_at = timestamp(now);
    }
    write_plan_artifact(&ArtifactPaths::new(dirs, &message_id), plan)?;
    debug!(base = %message_id.base(), "plan admitted");
    Ok(message_id)
}

/// Execute `plan` and write its scratch note and report.
#[instrument(skip_all, fields(base = %ctx.message_id.base(), kind = plan.task.kind()))]
pub fn execute<S: FileStore>(plan: &Plan, ctx: &ExecContext<'_, S>) -> Result<ExecutionReport> {
    ctx.dirs.create_all()?;
    let created_at = timestamp(Local::now().naive_local());

    let report = match &plan.task {
        Task::Codemod { edits, .. } => run_codemod(edits, ctx, &created_at),
        Task::Tool { tool, .. } => run_tool(tool, ctx, &created_at),
        Task::Analysis { analysis_file, .. } => run_analysis(analysis_file, ctx, &created_at),
        Task::Chat { .. } => run_analysis("", ctx, &created_at),
    };

    let paths = ArtifactPaths::new(ctx.dirs, &ctx.message_id);
    write_scratch(&paths, &report, plan.task.summary())?;
    write_report(&paths, &report)?;
    info!(
        touched = report.touched_files.len(),
        message = %report.message,
        "plan executed"
    );
    Ok(report)
}

fn run_codemod<S: FileStore>(
    edits: &[Edit],
    ctx: &ExecContext<'_, S>,
    created_at: &str,
) -> ExecutionReport {
    let outcome = CodemodExecutor::new(ctx.jail, ctx.store).apply(edits);
    let message = codemod_message(outcome.touched_files.len(), edits.len());
    ExecutionReport::new(
        &ctx.message_id,
        created_at,
        outcome.touched_files,
        ReportBody::Codemod {
            edits_requested: edits.len(),
            edit_logs: outcome.edit_logs,
        },
        message,
    )
}

fn run_tool<S: FileStore>(
    call: &ToolCall,
    ctx: &ExecContext<'_, S>,
    created_at: &str,
) -> ExecutionReport {
    let tool_ctx = ToolContext {
        jail: ctx.jail,
        notes_dir: &ctx.dirs.notes,
        settings: &ctx.config.tools,
        smtp: ctx.smtp,
        mailer: ctx.mailer,
    };
    let output = ctx.registry.dispatch(call, &tool_ctx);
    ExecutionReport::new(
        &ctx.message_id,
        created_at,
        Vec::new(),
        ReportBody::Tool {
            tool_name: call.name.clone(),
            tool_args: call.args.clone(),
            tool_result: output.result,
        },
        output.message,
    )
}

fn run_analysis<S: FileStore>(
    analysis_file: &str,
    ctx: &ExecContext<'_, S>,
    created_at: &str,
) -> ExecutionReport {
    let (relative, snippet) =
        read_analysis_file(analysis_file, ctx.jail, ctx.config.analysis_max_chars)
            .map_or((None, String::new()), |(rel, snippet)| (Some(rel), snippet));
    let message = match &relative {
        Some(rel) => format!("Chad fetched {rel} for analysis."),
        None => "Chad performed analysis-only; no file was read.".to_string(),
    };
    ExecutionReport::new(
        &ctx.message_id,
        created_at,
        Vec::new(),
        ReportBody::Analysis {
            analysis_file: relative,
            analysis_snippet: snippet,
        },
        message,
    )
}

/// Jail-relative name and leading snippet of `analysis_file`.
///
/// Non-UTF-8 content still counts as fetched, with an empty snippet.
fn read_analysis_file(
    analysis_file: &str,
    jail: &Jail,
    max_chars: usize,
) -> Option<(String, String)> {
    if analysis_file.trim().is_empty() {
        return None;
    }
    let target = jail.resolve(analysis_file).filter(|path| path.is_file())?;
    let relative = jail.relative(&target)?;
    let snippet = match fs::read_to_string(&target) {
        Ok(raw) => truncate_chars(&raw, max_chars).0.to_string(),
        Err(err) => {
            debug!(path = %relative, err = %err, "analysis file unreadable as UTF-8");
            String::new()
        }
    };
    Some((relative, snippet))
}

fn timestamp(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}
