//! `chad`: executes planner-authored plans inside a project jail.
//!
//! Reads a plan JSON file, applies it against the jail root, writes the
//! queue/scratch artifacts under the data directory, and prints the
//! execution report to stdout.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chad::core::types::ExecutionReport;
use chad::execute::{ExecContext, admit_plan, execute};
use chad::exit_codes;
use chad::io::config::{ChadConfig, JAIL_ENV, load_config};
use chad::io::jail::Jail;
use chad::io::mail::{SmtpMailer, SmtpSettings};
use chad::io::plan_store::load_plan;
use chad::io::store::DiskStore;
use chad::io::tools::ToolRegistry;
use chad::logging;
use chrono::Local;
use clap::{Parser, Subcommand};

const DEFAULT_CONFIG: &str = "chad.toml";

#[derive(Parser)]
#[command(
    name = "chad",
    version,
    about = "Jailed executor for planner-authored plans"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Jail root; overrides ENV_PROJECT_JAIL and the config file.
    #[arg(long, global = true)]
    jail: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a plan file and print the report JSON.
    Exec {
        /// Path to the plan JSON.
        plan: PathBuf,
    },
    /// Print the absolute path a jail-relative path resolves to.
    Resolve {
        /// Path relative to the jail root.
        path: String,
    },
    /// List built-in tools.
    Tools,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Exec { plan } => cmd_exec(&cli, plan),
        Command::Resolve { path } => cmd_resolve(&cli, path),
        Command::Tools => cmd_tools(),
    }
}

struct Setup {
    app_root: PathBuf,
    config: ChadConfig,
    jail: Jail,
}

fn setup(cli: &Cli) -> Result<Setup> {
    let app_root = env::current_dir().context("read current directory")?;
    let config = load_config(&app_root.join(&cli.config))?;
    let env_jail = env::var(JAIL_ENV).ok();
    let root = config.jail_root(cli.jail.as_deref(), env_jail.as_deref(), &app_root);
    let jail = Jail::new(&root)?;
    Ok(Setup {
        app_root,
        config,
        jail,
    })
}

fn cmd_exec(cli: &Cli, plan_path: &Path) -> Result<i32> {
    let Setup {
        app_root,
        config,
        jail,
    } = setup(cli)?;
    let dirs = config.data_dirs(&app_root);
    let mut plan = load_plan(plan_path)?;
    let message_id = admit_plan(&mut plan, &dirs, Local::now().naive_local())?;

    let smtp = SmtpSettings::from_env();
    let mailer = SmtpMailer::new(
        smtp.clone(),
        Duration::from_secs(config.tools.smtp.timeout_secs),
    );
    let registry = ToolRegistry::builtin();
    let ctx = ExecContext {
        jail: &jail,
        dirs: &dirs,
        message_id,
        config: &config,
        registry: &registry,
        smtp: &smtp,
        mailer: &mailer,
        store: &DiskStore,
    };
    let report = execute(&plan, &ctx)?;
    print_report(&report)?;
    if report.skipped_all_edits() {
        return Ok(exit_codes::NO_CHANGES);
    }
    Ok(exit_codes::OK)
}

fn cmd_resolve(cli: &Cli, path: &str) -> Result<i32> {
    let Setup { jail, .. } = setup(cli)?;
    let Some(resolved) = jail.resolve(path) else {
        bail!(
            "path {path:?} escapes the jail {}",
            jail.root().display()
        );
    };
    println!("{}", resolved.display());
    Ok(exit_codes::OK)
}

fn cmd_tools() -> Result<i32> {
    for (name, description) in ToolRegistry::builtin().describe() {
        println!("{name}\t{description}");
    }
    Ok(exit_codes::OK)
}

fn print_report(report: &ExecutionReport) -> Result<()> {
    let payload = serde_json::to_string_pretty(report).context("serialize report")?;
    println!("{payload}");
    Ok(())
}
