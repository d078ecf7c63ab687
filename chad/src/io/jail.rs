//! Project jail: every path the executor or a tool touches must resolve inside
//! one root directory.
//!
//! Resolution follows the real filesystem (symlinks and `..` against real
//! parents), not lexical string matching. The symlink graph is read at call
//! time, so a concurrent mutation between resolution and use is not defended
//! against.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Canonical root that bounds all file access for one executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jail {
    root: PathBuf,
}

impl Jail {
    /// Canonicalize `root` and use it as the jail. The directory must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root)
            .with_context(|| format!("canonicalize jail root {}", root.display()))?;
        if !canonical.is_dir() {
            return Err(anyhow!("jail root {} is not a directory", canonical.display()));
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` inside the jail; `None` means it escapes.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        resolve_in_jail(relative, &self.root)
    }

    /// Render a contained path as a `/`-separated jail-relative string.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return Some(".".to_string());
        }
        Some(parts.join("/"))
    }
}

/// Resolve `relative` against `root`, rejecting anything outside it.
///
/// `root` must already be canonical. An empty `relative` means the root
/// itself. Callers must treat `None` as a hard rejection.
pub fn resolve_in_jail(relative: &str, root: &Path) -> Option<PathBuf> {
    let relative = if relative.is_empty() { "." } else { relative };
    let joined = root.join(relative);
    let resolved = match resolve_existing_prefix(&joined) {
        Ok(path) => path,
        Err(err) => {
            debug!(path = %joined.display(), err = %err, "jail resolution failed");
            return None;
        }
    };
    if resolved.starts_with(root) {
        Some(resolved)
    } else {
        debug!(path = %resolved.display(), root = %root.display(), "path escapes jail");
        None
    }
}

/// Canonicalize every existing prefix of `path`, appending the missing tail
/// lexically.
///
/// Dangling symlinks, loops, and non-directory intermediate components are
/// errors.
fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match fs::symlink_metadata(&resolved) {
                    Ok(_) => resolved = fs::canonicalize(&resolved)?,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err),
                }
            }
        }
    }
    Ok(resolved)
}
