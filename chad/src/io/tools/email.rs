use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::read_file::TRUNCATION_NOTICE;
use super::{ToolContext, ToolOutput, str_arg, string_list_arg};
use crate::core::text::truncate_chars;
use crate::core::types::ToolArgs;
use crate::io::mail::{EmailAttachment, OutgoingEmail};

const PREVIEW_MAX_CHARS: usize = 16_000;

pub(super) fn run(args: &ToolArgs, ctx: &ToolContext<'_>) -> ToolOutput {
    // The recipient is fixed by the server; any `to` argument is ignored.
    let Some(to) = ctx.smtp.to.clone() else {
        return ToolOutput::failure(
            "Chad was asked to send_email, but no SMTP_TO / SMTP_TEST_TO address is \
             configured in the environment.",
        );
    };
    let (Some(_), Some(from)) = (&ctx.smtp.host, ctx.smtp.from.clone()) else {
        return ToolOutput::failure(
            "Chad was asked to send_email, but SMTP settings are incomplete \
             (need at least SMTP_HOST and SMTP_FROM or SMTP_USERNAME).",
        );
    };

    let mut subject = str_arg(args, &["subject"])
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let body = str_arg(args, &["body"]).unwrap_or_default();

    let mut attachments = Vec::new();
    let mut auto_note = None;
    if args.contains_key("attachments") {
        for rel in string_list_arg(args, "attachments") {
            match ctx.jail.resolve(&rel).filter(|path| path.is_file()) {
                Some(path) => match fs::read(&path) {
                    Ok(data) => attachments.push(EmailAttachment::from_bytes(&path, data)),
                    Err(err) => warn!(attachment = %rel, err = %err, "skipping unreadable attachment"),
                },
                None => debug!(attachment = %rel, "skipping attachment outside jail"),
            }
        }
    } else if let Some(note) = latest_note(ctx.notes_dir) {
        match fs::read(&note) {
            Ok(data) => {
                let name = file_name(&note);
                if subject.is_empty() {
                    subject = format!("[Chad] {name}");
                }
                attachments.push(EmailAttachment::from_bytes(&note, data));
                auto_note = Some(note);
            }
            Err(err) => warn!(note = %note.display(), err = %err, "skipping unreadable note"),
        }
    }

    let email = OutgoingEmail {
        from,
        to: to.clone(),
        subject: if subject.is_empty() {
            "(no subject)".to_string()
        } else {
            subject.clone()
        },
        body,
        attachments,
    };
    if let Err(err) = ctx.mailer.send(&email) {
        warn!(err = %err, "send_email failed");
        return ToolOutput::failure(format!("Chad failed to send_email due to error: {err:#}"));
    }

    let result = match auto_note {
        Some(note) => format!(
            "Attached file preview (notes/{}):\n{}",
            file_name(&note),
            note_preview(&note)
        ),
        None => format!("Email sent to {to} with subject: {}", email.subject),
    };
    ToolOutput::new(
        result,
        format!("Chad sent an email to '{to}' with subject '{subject}'."),
    )
}

/// Most recently modified `*.md` file in `notes_dir`.
fn latest_note(notes_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(notes_dir).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max()
        .map(|(_, path)| path)
}

fn note_preview(note: &Path) -> String {
    let Ok(raw) = fs::read_to_string(note) else {
        return "(could not read note content)".to_string();
    };
    let (kept, truncated) = truncate_chars(&raw, PREVIEW_MAX_CHARS);
    if truncated {
        format!("{kept}{TRUNCATION_NOTICE}")
    } else {
        kept.to_string()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
