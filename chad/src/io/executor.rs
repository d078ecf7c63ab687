//! Codemod executor: applies a plan's edits inside the jail.
//!
//! Edits run strictly in list order and independently of each other. Every
//! attempt (applied, skipped, or failed) produces at least one
//! [`EditLogEntry`]; no data-level problem is ever returned as an error, so a
//! bad edit can never abort the rest of the batch.
//!
//! Existence policy: `create_or_overwrite_file` and `append_to_bottom` create
//! missing targets; `prepend_comment` requires the target to exist.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::core::codemod::{
    REASON_JAIL_ESCAPE, REASON_MISSING_FIELDS, REASON_MISSING_FILE, compute_edit,
    unknown_operation_reason,
};
use crate::core::text::normalize_newlines;
use crate::core::types::{Edit, EditLogEntry, EditOperation};
use crate::io::jail::Jail;
use crate::io::store::FileStore;

/// Files written and audit lines produced by one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodemodOutcome {
    /// Jail-relative paths that were written, in edit order.
    pub touched_files: Vec<String>,
    pub edit_logs: Vec<EditLogEntry>,
}

/// Applies edits against one jail through one [`FileStore`].
pub struct CodemodExecutor<'a, S: FileStore> {
    jail: &'a Jail,
    store: &'a S,
}

impl<'a, S: FileStore> CodemodExecutor<'a, S> {
    pub fn new(jail: &'a Jail, store: &'a S) -> Self {
        Self { jail, store }
    }

    /// Apply `edits` in order and collect the outcome.
    #[instrument(skip_all, fields(edits = edits.len(), root = %self.jail.root().display()))]
    pub fn apply(&self, edits: &[Edit]) -> CodemodOutcome {
        let mut outcome = CodemodOutcome::default();
        for edit in edits {
            self.apply_one(edit, &mut outcome);
        }
        info!(
            touched = outcome.touched_files.len(),
            logs = outcome.edit_logs.len(),
            "codemod batch finished"
        );
        outcome
    }

    fn apply_one(&self, edit: &Edit, outcome: &mut CodemodOutcome) {
        let Some((file, operation)) = edit.target() else {
            warn!("edit missing file or operation");
            outcome.edit_logs.push(EditLogEntry::new(
                edit.file.as_deref(),
                edit.operation.as_ref().map(EditOperation::as_str),
                REASON_MISSING_FIELDS,
            ));
            return;
        };
        let mut log = |reason: &str| {
            outcome
                .edit_logs
                .push(EditLogEntry::new(Some(file), Some(operation.as_str()), reason));
        };

        let Some(target) = self.jail.resolve(file) else {
            warn!(file, "edit target escapes jail");
            log(REASON_JAIL_ESCAPE);
            return;
        };
        if let EditOperation::Unknown(raw) = operation {
            warn!(file, operation = %raw, "unknown edit operation");
            log(&unknown_operation_reason(raw));
            return;
        }

        let original = match self.store.read_text(&target) {
            Ok(Some(text)) => normalize_newlines(&text),
            Ok(None) if *operation == EditOperation::PrependComment => {
                debug!(file, "prepend target missing");
                log(REASON_MISSING_FILE);
                return;
            }
            Ok(None) => String::new(),
            Err(err) => {
                warn!(file, err = %err, "failed to read edit target");
                log(&format!("could not read target file from disk: {err}"));
                return;
            }
        };

        let Some(computed) = compute_edit(operation, &target, &original, &edit.content) else {
            log(&unknown_operation_reason(operation.as_str()));
            return;
        };
        if computed.stripped_control_chars {
            warn!(file, "stripped suspicious control characters");
            log(computed.warning_reason);
        }
        if computed.is_noop(&original) {
            debug!(file, "edit is a no-op");
            log(computed.noop_reason);
            return;
        }

        if let Err(err) = self.store.write_text(&target, &computed.text) {
            warn!(file, err = %err, "failed to write edit target");
            log(&format!("could not write target file to disk: {err}"));
            return;
        }
        log(computed.success_reason);
        let relative = self.relative_or_raw(&target, file);
        debug!(file = %relative, operation = operation.as_str(), "edit applied");
        outcome.touched_files.push(relative);
    }

    fn relative_or_raw(&self, target: &Path, raw: &str) -> String {
        self.jail
            .relative(target)
            .unwrap_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::DiskStore;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    /// In-memory store that can fail reads or writes for chosen paths.
    #[derive(Default)]
    struct FakeStore {
        files: RefCell<HashMap<PathBuf, String>>,
        fail_read: Vec<PathBuf>,
        fail_write: Vec<PathBuf>,
    }

    impl FileStore for FakeStore {
        fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
            if self.fail_read.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self.files.borrow().get(path).cloned())
        }

        fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
            if self.fail_write.iter().any(|p| p == path) {
                return Err(io::Error::other("disk full"));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), text.to_string());
            Ok(())
        }
    }

    fn temp_jail() -> (tempfile::TempDir, Jail) {
        let temp = tempfile::tempdir().expect("tempdir");
        let jail = Jail::new(temp.path()).expect("jail");
        (temp, jail)
    }

    fn reasons(outcome: &CodemodOutcome) -> Vec<&str> {
        outcome
            .edit_logs
            .iter()
            .map(|entry| entry.reason.as_str())
            .collect()
    }

    #[test]
    fn missing_fields_are_logged_and_skipped() {
        let (_temp, jail) = temp_jail();
        let edit = Edit {
            file: None,
            operation: Some(EditOperation::Append),
            content: "x".to_string(),
        };
        let outcome = CodemodExecutor::new(&jail, &DiskStore).apply(&[edit]);
        assert!(outcome.touched_files.is_empty());
        assert_eq!(
            outcome.edit_logs,
            vec![EditLogEntry::new(
                None,
                Some("append_to_bottom"),
                REASON_MISSING_FIELDS
            )]
        );
        assert_eq!(outcome.edit_logs[0].file, "(none)");
    }

    #[test]
    fn unknown_operation_is_checked_before_existence() {
        let (temp, jail) = temp_jail();
        let outcome = CodemodExecutor::new(&jail, &DiskStore)
            .apply(&[Edit::new("a.txt", "delete_file", "")]);
        assert_eq!(reasons(&outcome), vec!["unknown operation 'delete_file'"]);
        assert!(!temp.path().join("a.txt").exists());
    }

    #[test]
    fn overwrite_creates_missing_file_with_parents() {
        let (temp, jail) = temp_jail();
        let outcome = CodemodExecutor::new(&jail, &DiskStore).apply(&[Edit::new(
            "pkg/sub/mod.py",
            "create_or_overwrite_file",
            "x = 1\r\n",
        )]);
        assert_eq!(outcome.touched_files, vec!["pkg/sub/mod.py"]);
        assert_eq!(
            fs::read_to_string(temp.path().join("pkg/sub/mod.py")).expect("read"),
            "x = 1\n"
        );
    }

    #[test]
    fn control_char_warning_precedes_success_entry() {
        let (temp, jail) = temp_jail();
        let outcome = CodemodExecutor::new(&jail, &DiskStore).apply(&[Edit::new(
            "a.txt",
            "create_or_overwrite_file",
            "a\x0bb £\n",
        )]);
        assert_eq!(
            reasons(&outcome),
            vec![
                "new content contained suspicious control characters which were stripped",
                "file overwritten with new content",
            ]
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).expect("read"),
            "ab £\n"
        );
    }

    #[test]
    fn crlf_only_difference_is_a_noop() {
        let (temp, jail) = temp_jail();
        fs::write(temp.path().join("a.txt"), "one\r\ntwo\r\n").expect("seed");
        let outcome = CodemodExecutor::new(&jail, &DiskStore).apply(&[Edit::new(
            "a.txt",
            "create_or_overwrite_file",
            "one\ntwo\n",
        )]);
        assert!(outcome.touched_files.is_empty());
        assert_eq!(
            reasons(&outcome),
            vec!["new content is identical to existing file"]
        );
        assert_eq!(
            fs::read(temp.path().join("a.txt")).expect("read"),
            b"one\r\ntwo\r\n"
        );
    }

    #[test]
    fn read_failure_is_recorded_and_batch_continues() {
        let (_temp, jail) = temp_jail();
        let store = FakeStore {
            fail_read: vec![jail.root().join("locked.txt")],
            ..FakeStore::default()
        };
        let outcome = CodemodExecutor::new(&jail, &store).apply(&[
            Edit::new("locked.txt", "append_to_bottom", "x"),
            Edit::new("open.txt", "create_or_overwrite_file", "y\n"),
        ]);
        assert_eq!(
            reasons(&outcome),
            vec![
                "could not read target file from disk: denied",
                "file overwritten with new content",
            ]
        );
        assert_eq!(outcome.touched_files, vec!["open.txt"]);
    }

    #[test]
    fn write_failure_is_recorded_and_not_touched() {
        let (_temp, jail) = temp_jail();
        let store = FakeStore {
            fail_write: vec![jail.root().join("full.txt")],
            ..FakeStore::default()
        };
        let outcome = CodemodExecutor::new(&jail, &store)
            .apply(&[Edit::new("full.txt", "create_or_overwrite_file", "data")]);
        assert!(outcome.touched_files.is_empty());
        assert_eq!(
            reasons(&outcome),
            vec!["could not write target file to disk: disk full"]
        );
    }

    #[test]
    fn edits_apply_in_order_against_updated_content() {
        let (temp, jail) = temp_jail();
        let outcome = CodemodExecutor::new(&jail, &DiskStore).apply(&[
            Edit::new("notes.sh", "create_or_overwrite_file", "echo hi\n"),
            Edit::new("notes.sh", "prepend_comment", "generated"),
            Edit::new("notes.sh", "append_to_bottom", "echo bye"),
        ]);
        assert_eq!(outcome.touched_files, vec!["notes.sh", "notes.sh", "notes.sh"]);
        assert_eq!(
            fs::read_to_string(temp.path().join("notes.sh")).expect("read"),
            "# generated\n\necho hi\n\necho bye\n"
        );
    }
}
