//! Queue and scratch artifacts for one executed plan.
//!
//! Every request leaves three files behind, all named after its
//! [`MessageId`] base: the plan and the report in the queue directory, and a
//! human-readable audit note in the scratch directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::types::{ExecutionReport, MessageId, Plan, ReportBody};
use crate::io::config::DataDirs;
use crate::io::plan_store::write_plan;

const SCRATCH_TEMPLATE: &str = include_str!("templates/scratch.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub plan: PathBuf,
    pub report: PathBuf,
    pub scratch: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dirs: &DataDirs, id: &MessageId) -> Self {
        let base = id.base();
        Self {
            plan: dirs.queue.join(format!("{base}.plan.json")),
            report: dirs.queue.join(format!("{base}.exec.json")),
            scratch: dirs.scratch.join(format!("{base}.txt")),
        }
    }
}

pub fn write_plan_artifact(paths: &ArtifactPaths, plan: &Plan) -> Result<()> {
    debug!(path = %paths.plan.display(), "writing plan artifact");
    write_plan(&paths.plan, plan)
}

/// Write the report as pretty JSON plus a trailing newline.
pub fn write_report(paths: &ArtifactPaths, report: &ExecutionReport) -> Result<()> {
    debug!(path = %paths.report.display(), "writing exec report");
    let mut buf = serde_json::to_string_pretty(report)?;
    buf.push('\n');
    write_text(&paths.report, &buf)
}

pub fn write_scratch(paths: &ArtifactPaths, report: &ExecutionReport, summary: &str) -> Result<()> {
    debug!(path = %paths.scratch.display(), "writing scratch note");
    let rendered = render_scratch(report, summary)?;
    write_text(&paths.scratch, &rendered)
}

/// Render the scratch audit note for `report`.
pub fn render_scratch(report: &ExecutionReport, summary: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template("scratch", SCRATCH_TEMPLATE)?;
    let template = env.get_template("scratch")?;

    let base = MessageId::new(report.id.as_str(), report.date.as_str()).base();
    let common = context! {
        base => base,
        created_at => &report.created_at,
        summary => summary.trim(),
        message => &report.message,
    };
    let rendered = match &report.body {
        ReportBody::Codemod {
            edits_requested,
            edit_logs,
        } => template.render(context! {
            title => "execution",
            body => "codemod",
            edits_requested => edits_requested,
            touched_files => &report.touched_files,
            edit_logs => edit_logs,
            ..common
        })?,
        ReportBody::Tool {
            tool_name,
            tool_args,
            tool_result,
        } => template.render(context! {
            title => "tool execution",
            body => "tool",
            tool_name => tool_name,
            tool_args => compact_json(tool_args),
            tool_result => tool_result,
            ..common
        })?,
        ReportBody::Analysis { analysis_file, .. } => template.render(context! {
            title => "analysis execution",
            body => "analysis",
            analysis_file => analysis_file,
            ..common
        })?,
    };
    Ok(rendered)
}

fn compact_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
