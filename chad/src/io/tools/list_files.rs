use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::{ToolContext, ToolOutput, bool_arg, str_arg, usize_arg};
use crate::core::types::ToolArgs;
use crate::io::jail::Jail;

struct Entry {
    path: String,
    is_dir: bool,
    size: Option<u64>,
}

impl Entry {
    fn render(&self) -> String {
        let (kind, size) = if self.is_dir {
            ("dir", "dir".to_string())
        } else {
            let size = self.size.map_or_else(|| "?".to_string(), |s| s.to_string());
            ("file", size)
        };
        format!("- {}  [{kind}]  {size}", self.path)
    }
}

pub(super) fn run(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    let rel = str_arg(args, &["path"]).unwrap_or_else(|| ".".to_string());
    let recursive = bool_arg(args, "recursive");
    let max_entries = usize_arg(args, "max_entries", ctx.settings.list_max_entries);

    let Some(base) = ctx.jail.resolve(&rel).filter(|path| path.exists()) else {
        return ToolOutput::failure(format!(
            "Chad tried to list_files at '{rel}' but the path was invalid or outside the project jail."
        ));
    };

    let entries = if !base.is_dir() {
        vec![entry_for(ctx.jail, &base, false, fs::metadata(&base).ok())]
    } else if recursive {
        walk(ctx.jail, &base, max_entries)
    } else {
        read_dir_sorted(ctx.jail, &base, max_entries)
    };
    debug!(path = %rel, count = entries.len(), recursive, "listed entries");

    if entries.is_empty() {
        return ToolOutput::new(
            "No files or directories found.",
            format!("Chad found no entries under '{rel}'."),
        );
    }

    let mut lines = vec!["Path / Type / Size(bytes):".to_string()];
    lines.extend(entries.iter().map(Entry::render));
    ToolOutput::new(
        lines.join("\n"),
        format!("Chad listed up to {} entries under '{rel}'.", entries.len()),
    )
}

fn walk(jail: &Jail, base: &Path, max_entries: usize) -> Vec<Entry> {
    WalkDir::new(base)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .take(max_entries)
        .map(|entry| {
            let is_dir = entry.file_type().is_dir();
            entry_for(jail, entry.path(), is_dir, entry.metadata().ok())
        })
        .collect()
}

fn read_dir_sorted(jail: &Jail, base: &Path, max_entries: usize) -> Vec<Entry> {
    let Ok(read_dir) = fs::read_dir(base) else {
        return Vec::new();
    };
    let mut paths: Vec<_> = read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    paths
        .into_iter()
        .take(max_entries)
        .map(|path| {
            let metadata = fs::metadata(&path).ok();
            let is_dir = metadata.as_ref().is_some_and(fs::Metadata::is_dir);
            entry_for(jail, &path, is_dir, metadata)
        })
        .collect()
}

fn entry_for(jail: &Jail, path: &Path, is_dir: bool, metadata: Option<fs::Metadata>) -> Entry {
    let rel = jail.relative(path).unwrap_or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Entry {
        path: rel,
        is_dir,
        size: metadata.map(|m| m.len()),
    }
}
