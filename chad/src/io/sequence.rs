//! Message id allocation backed by `seq.txt`.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::core::types::MessageId;

/// Allocate the next message id (`00001`, `00002`, ...) for `today`.
///
/// A missing, empty, or unparsable counter file counts as `0`. The new value
/// is written back atomically before the id is returned.
pub fn next_message_id(seq_path: &Path, today: NaiveDate) -> Result<MessageId> {
    let current = read_counter(seq_path)?;
    let next = current + 1;
    write_atomic(seq_path, &next.to_string())?;
    let id = MessageId::new(format!("{next:05}"), today.format("%Y-%m-%d").to_string());
    debug!(base = %id.base(), "allocated message id");
    Ok(id)
}

fn read_counter(path: &Path) -> Result<u64> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    match trimmed.parse() {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(path = %path.display(), err = %err, "sequence file unparsable, restarting at 0");
            Ok(0)
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("sequence path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("txt.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp sequence {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace sequence {}", path.display()))?;
    Ok(())
}
