//! Executor configuration (`chad.toml`) plus environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming the jail root. Beats every other source
/// except an explicit `--jail` flag.
pub const JAIL_ENV: &str = "ENV_PROJECT_JAIL";

/// Executor configuration (TOML).
///
/// Missing fields fall back to defaults. SMTP credentials never live here;
/// they are read from the environment by [`crate::io::mail::SmtpSettings`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChadConfig {
    /// Root for queue, scratch, notes, and the sequence file. Relative paths
    /// are taken from the application root.
    pub data_dir: PathBuf,

    /// Jail root when `ENV_PROJECT_JAIL` is unset.
    pub jail_root: Option<PathBuf>,

    /// Characters of `analysis_file` kept in the report snippet.
    pub analysis_max_chars: usize,

    pub tools: ToolSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolSettings {
    /// Default `max_chars` for `read_file`.
    pub read_file_max_chars: usize,
    /// Default `max_entries` for `list_files`.
    pub list_max_entries: usize,
    pub script: ScriptSettings,
    pub smtp: SmtpTimeouts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptSettings {
    /// Program used to run `run_python_script` targets.
    pub interpreter: String,
    /// Default timeout when the tool call does not pass one.
    pub timeout_secs: u64,
    /// Per-stream cap on captured stdout/stderr.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmtpTimeouts {
    pub timeout_secs: u64,
}

impl Default for ChadConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            jail_root: None,
            analysis_max_chars: 16_000,
            tools: ToolSettings::default(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            read_file_max_chars: 16_000,
            list_max_entries: 200,
            script: ScriptSettings::default(),
            smtp: SmtpTimeouts::default(),
        }
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 600,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for SmtpTimeouts {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Artifact locations under `data_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    pub queue: PathBuf,
    pub scratch: PathBuf,
    pub notes: PathBuf,
    pub seq_file: PathBuf,
}

impl DataDirs {
    pub fn under(data_dir: &Path) -> Self {
        Self {
            queue: data_dir.join("queue"),
            scratch: data_dir.join("scratch"),
            notes: data_dir.join("notes"),
            seq_file: data_dir.join("seq.txt"),
        }
    }

    /// Create the three artifact directories.
    pub fn create_all(&self) -> Result<()> {
        for dir in [&self.queue, &self.scratch, &self.notes] {
            fs::create_dir_all(dir)
                .with_context(|| format!("create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

impl ChadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow!("data_dir must not be empty"));
        }
        if self.analysis_max_chars == 0 {
            return Err(anyhow!("analysis_max_chars must be > 0"));
        }
        if self.tools.read_file_max_chars == 0 {
            return Err(anyhow!("tools.read_file_max_chars must be > 0"));
        }
        if self.tools.list_max_entries == 0 {
            return Err(anyhow!("tools.list_max_entries must be > 0"));
        }
        if self.tools.script.interpreter.trim().is_empty() {
            return Err(anyhow!("tools.script.interpreter must be non-empty"));
        }
        if self.tools.script.timeout_secs == 0 {
            return Err(anyhow!("tools.script.timeout_secs must be > 0"));
        }
        if self.tools.script.output_limit_bytes == 0 {
            return Err(anyhow!("tools.script.output_limit_bytes must be > 0"));
        }
        if self.tools.smtp.timeout_secs == 0 {
            return Err(anyhow!("tools.smtp.timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn data_dirs(&self, app_root: &Path) -> DataDirs {
        DataDirs::under(&app_root.join(&self.data_dir))
    }

    /// Pick the jail root: `cli`, then `env`, then `jail_root`, then
    /// `app_root`. Relative choices are taken from `app_root`.
    pub fn jail_root(&self, cli: Option<&Path>, env: Option<&str>, app_root: &Path) -> PathBuf {
        let env = env.map(str::trim).filter(|v| !v.is_empty()).map(Path::new);
        let chosen = cli
            .or(env)
            .or(self.jail_root.as_deref())
            .unwrap_or(app_root);
        debug!(root = %chosen.display(), "jail root selected");
        app_root.join(chosen)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ChadConfig::default()`.
pub fn load_config(path: &Path) -> Result<ChadConfig> {
    if !path.exists() {
        let cfg = ChadConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ChadConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ChadConfig::default());
        assert_eq!(cfg.tools.script.timeout_secs, 600);
        assert_eq!(cfg.tools.smtp.timeout_secs, 30);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("chad.toml");
        fs::write(
            &path,
            "jail_root = \"/srv/project\"\n\n[tools.script]\ninterpreter = \"python3.12\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.jail_root, Some(PathBuf::from("/srv/project")));
        assert_eq!(cfg.tools.script.interpreter, "python3.12");
        assert_eq!(cfg.tools.script.timeout_secs, 600);
        assert_eq!(cfg.analysis_max_chars, 16_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("chad.toml");
        fs::write(&path, "analysis_max_chars = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("analysis_max_chars"));
    }

    #[test]
    fn jail_root_precedence() {
        let app = Path::new("/app");
        let mut cfg = ChadConfig::default();
        assert_eq!(cfg.jail_root(None, None, app), PathBuf::from("/app"));

        cfg.jail_root = Some(PathBuf::from("project"));
        assert_eq!(cfg.jail_root(None, None, app), PathBuf::from("/app/project"));
        assert_eq!(cfg.jail_root(None, Some("  "), app), PathBuf::from("/app/project"));
        assert_eq!(cfg.jail_root(None, Some("/env/jail"), app), PathBuf::from("/env/jail"));
        assert_eq!(
            cfg.jail_root(Some(Path::new("/cli")), Some("/env/jail"), app),
            PathBuf::from("/cli")
        );
    }

    #[test]
    fn data_dirs_live_under_data_dir() {
        let dirs = ChadConfig::default().data_dirs(Path::new("/app"));
        assert_eq!(dirs.queue, PathBuf::from("/app/data/queue"));
        assert_eq!(dirs.notes, PathBuf::from("/app/data/notes"));
        assert_eq!(dirs.seq_file, PathBuf::from("/app/data/seq.txt"));
    }
}
