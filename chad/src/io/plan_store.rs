//! Plan load/save helpers with schema validation.
//!
//! The schema only checks structure (object shapes and string fields). Edit
//! semantics such as unknown operations or missing files are left to the
//! executor so that one bad edit never rejects the whole plan.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::types::Plan;

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

/// Load a plan from disk and validate it against the plan schema.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    parse_plan(&contents).with_context(|| format!("load plan {}", path.display()))
}

/// Parse and validate a plan from JSON text.
pub fn parse_plan(contents: &str) -> Result<Plan> {
    let value: Value = serde_json::from_str(contents).context("parse plan json")?;
    validate_schema(&value)?;
    let plan: Plan = serde_json::from_value(value).context("deserialize plan")?;
    debug!(kind = plan.task.kind(), id = %plan.id, "plan loaded");
    Ok(plan)
}

/// Write a plan as pretty JSON with a trailing newline.
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(plan)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write plan {}", path.display()))
}

fn validate_schema(plan: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(PLAN_SCHEMA).context("parse plan schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(plan) {
        let messages = compiled
            .iter_errors(plan)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "plan schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
