//! File access seam for the codemod executor.
//!
//! The [`FileStore`] trait decouples the executor state machine from the disk
//! so tests can inject read/write failures without touching permissions.

use std::fs;
use std::io;
use std::path::Path;

use crate::core::text::normalize_newlines;

/// Reader/writer used by the executor for target files.
pub trait FileStore {
    /// Read `path` as UTF-8, replacing invalid bytes. `Ok(None)` if missing.
    fn read_text(&self, path: &Path) -> io::Result<Option<String>>;

    /// Write `text` as UTF-8 with `\n` line endings, creating parent dirs.
    fn write_text(&self, path: &Path, text: &str) -> io::Result<()>;
}

/// [`FileStore`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, normalize_newlines(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_file_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let read = DiskStore
            .read_text(&temp.path().join("missing.txt"))
            .expect("read");
        assert_eq!(read, None);
    }

    #[test]
    fn read_replaces_invalid_utf8() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad.txt");
        fs::write(&path, b"ok \xff\xfe end").expect("write bytes");
        let read = DiskStore.read_text(&path).expect("read").expect("exists");
        assert_eq!(read, "ok \u{FFFD}\u{FFFD} end");
    }

    #[test]
    fn write_creates_parents_and_forces_lf() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b/c.txt");
        DiskStore.write_text(&path, "x\r\ny\r").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "x\ny\n");
    }

    #[test]
    fn reading_a_directory_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(DiskStore.read_text(temp.path()).is_err());
    }
}
