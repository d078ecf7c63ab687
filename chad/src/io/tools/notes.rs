use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use super::{ToolContext, ToolOutput, str_arg};
use crate::core::text::slugify_for_markdown;
use crate::core::types::ToolArgs;

struct NoteRequest {
    /// Title as given, or the slug when none was given.
    display: String,
    slug: String,
    content: String,
}

impl NoteRequest {
    fn parse(args: &ToolArgs) -> Self {
        let title = str_arg(args, &["title", "name"])
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        let content = str_arg(args, &["content", "body"]).unwrap_or_default();
        let slug = slugify_for_markdown(
            if title.is_empty() { "note" } else { &title },
            Local::now().naive_local(),
        );
        let display = if title.is_empty() { slug.clone() } else { title };
        Self {
            display,
            slug,
            content,
        }
    }

    fn path(&self, notes_dir: &Path) -> PathBuf {
        notes_dir.join(format!("{}.md", self.slug))
    }
}

pub(super) fn create(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    let note = NoteRequest::parse(args);
    let path = note.path(ctx.notes_dir);
    if let Err(err) = fs::create_dir_all(ctx.notes_dir).and_then(|()| fs::write(&path, &note.content))
    {
        warn!(path = %path.display(), err = %err, "failed to create note");
        return ToolOutput::failure(format!("Chad failed to create a markdown note: {err}"));
    }
    ToolOutput::new(
        format!(
            "Created markdown note '{}' at notes/{}.md.",
            note.display, note.slug
        ),
        "Chad created a new markdown note.",
    )
}

pub(super) fn append(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    let note = NoteRequest::parse(args);
    let path = note.path(ctx.notes_dir);

    if !path.exists() {
        if let Err(err) =
            fs::create_dir_all(ctx.notes_dir).and_then(|()| fs::write(&path, &note.content))
        {
            warn!(path = %path.display(), err = %err, "failed to create note");
            return ToolOutput::failure(format!("Chad failed to create a markdown note: {err}"));
        }
        return ToolOutput::new(
            format!(
                "Note '{}' did not exist; created notes/{}.md.",
                note.display, note.slug
            ),
            "Chad could not find an existing markdown note, so he created it.",
        );
    }

    let mut block = note.content;
    if !block.ends_with('\n') {
        block.push('\n');
    }
    let appended = OpenOptions::new()
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(block.as_bytes()));
    if let Err(err) = appended {
        warn!(path = %path.display(), err = %err, "failed to append to note");
        return ToolOutput::failure(format!("Chad failed to append to a markdown note: {err}"));
    }
    ToolOutput::new(
        format!(
            "Appended to markdown note '{}' at notes/{}.md.",
            note.display, note.slug
        ),
        "Chad appended to an existing markdown note.",
    )
}
