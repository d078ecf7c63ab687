//! CLI tests for `chad exec`, `chad resolve`, and `chad tools`.
//!
//! Spawns the chad binary from a temporary app root holding a `project/`
//! jail and verifies exit codes, stdout, and the files left on disk.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use chad::core::types::Edit;
use chad::exit_codes;
use chad::io::config::JAIL_ENV;
use chad::io::plan_store::write_plan;
use chad::test_support::{TestJail, codemod_plan};
use serde_json::Value;

fn chad(app_root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chad"))
        .current_dir(app_root)
        .env_remove(JAIL_ENV)
        .args(args)
        .output()
        .expect("run chad")
}

fn write_codemod(fixture: &TestJail, edits: Vec<Edit>) {
    write_plan(&fixture.temp.path().join("plan.json"), &codemod_plan(edits)).expect("write plan");
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("report json on stdout")
}

#[test]
fn exec_applies_edits_and_prints_report() {
    let fixture = TestJail::new();
    write_codemod(
        &fixture,
        vec![Edit::new("src/a.txt", "create_or_overwrite_file", "hello\n")],
    );

    let output = chad(
        fixture.temp.path(),
        &["exec", "plan.json", "--jail", "project"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(fixture.read("src/a.txt"), "hello\n");
    let report = stdout_json(&output);
    assert_eq!(report["touched_files"][0], "src/a.txt");
    assert_eq!(report["kind"], "exec_result");
    let queued: Vec<String> = fs::read_dir(fixture.temp.path().join("data/queue"))
        .expect("queue dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(queued.iter().any(|name| name.ends_with(".plan.json")));
    assert!(queued.iter().any(|name| name.ends_with(".exec.json")));
    assert_eq!(
        fs::read_to_string(fixture.temp.path().join("data/seq.txt")).expect("seq"),
        "1"
    );
}

#[test]
fn exec_with_all_edits_skipped_exits_with_no_changes() {
    let fixture = TestJail::new();
    write_codemod(
        &fixture,
        vec![Edit::new("../outside/secret.txt", "append_to_bottom", "x")],
    );

    let output = chad(
        fixture.temp.path(),
        &["exec", "plan.json", "--jail", "project"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::NO_CHANGES));
    let report = stdout_json(&output);
    assert_eq!(
        report["edit_logs"][0]["reason"],
        "target path escapes project jail"
    );
    assert_eq!(
        fs::read_to_string(fixture.outside_secret()).expect("secret"),
        "secret\n"
    );
}

#[test]
fn exec_rejects_plan_without_task() {
    let fixture = TestJail::new();
    fs::write(fixture.temp.path().join("plan.json"), "{\"id\": \"1\"}").expect("write plan");

    let output = chad(
        fixture.temp.path(),
        &["exec", "plan.json", "--jail", "project"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(output.stdout.is_empty());
}

#[test]
fn jail_env_var_is_used_when_flag_is_absent() {
    let fixture = TestJail::new();
    write_codemod(
        &fixture,
        vec![Edit::new("env.txt", "create_or_overwrite_file", "from env\n")],
    );

    let status = Command::new(env!("CARGO_BIN_EXE_chad"))
        .current_dir(fixture.temp.path())
        .env(JAIL_ENV, fixture.root())
        .args(["exec", "plan.json"])
        .status()
        .expect("run chad");

    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(fixture.read("env.txt"), "from env\n");
    assert!(!fixture.temp.path().join("env.txt").exists());
}

#[test]
fn resolve_prints_path_inside_jail() {
    let fixture = TestJail::new();
    let output = chad(
        fixture.temp.path(),
        &["resolve", "src/new.py", "--jail", "project"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let printed = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(
        printed.trim_end(),
        fixture.root().join("src/new.py").display().to_string()
    );
}

#[test]
fn resolve_escape_exits_invalid() {
    let fixture = TestJail::new();
    let output = chad(
        fixture.temp.path(),
        &["resolve", "../outside/secret.txt", "--jail", "project"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("escapes the jail"), "{stderr}");
}

#[test]
fn tools_lists_builtin_registry() {
    let fixture = TestJail::new();
    let output = chad(fixture.temp.path(), &["tools"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let listing = String::from_utf8(output.stdout).expect("utf8");
    let names: Vec<&str> = listing
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    for name in [
        "append_to_markdown_note",
        "create_markdown_note",
        "get_current_datetime",
        "list_files",
        "read_file",
        "run_python_script",
        "send_email",
    ] {
        assert!(names.contains(&name), "missing {name} in {listing}");
    }
}
