//! CLI subprocess integration tests.
//!
//! These tests invoke the `crondeck` binary as a subprocess and verify
//! exit codes, stdout content, and scaffolding behavior. HOME is pointed
//! at an empty directory so no user config leaks in.

use std::process::Command;

fn crondeck_bin(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crondeck"));
    cmd.env("HOME", home);
    cmd
}

fn temp_home() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn cli_version_exits_zero() {
    let home = temp_home();
    let output = crondeck_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "crondeck --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("crondeck"),
        "version output must contain 'crondeck': {stdout}"
    );
}

#[test]
fn cli_help_lists_command_groups() {
    let home = temp_home();
    let output = crondeck_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success(), "crondeck --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("functions"),
        "help must list 'functions': {stdout}"
    );
    assert!(stdout.contains("events"), "help must list 'events': {stdout}");
}

#[test]
fn list_without_endpoint_or_config_fails() {
    let home = temp_home();
    let output = crondeck_bin(home.path())
        .args(["functions", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no --endpoint and no config"),
        "stderr: {stderr}"
    );
}

#[test]
fn deploy_without_declaration_exits_with_declaration_code() {
    let home = temp_home();
    let project = tempfile::tempdir().unwrap();
    let output = crondeck_bin(home.path())
        .current_dir(project.path())
        .args(["functions", "deploy"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("declaration error"), "stderr: {stderr}");
}

#[test]
fn new_scaffolds_a_function_project() {
    let home = temp_home();
    let project = tempfile::tempdir().unwrap();
    let output = crondeck_bin(home.path())
        .current_dir(project.path())
        .args(["functions", "new", "report", "--bucket", "artifacts"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "new must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let declaration: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(project.path().join("function.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(declaration["name"], "report");
    assert_eq!(declaration["s3_bucket"], "artifacts");
    assert!(project.path().join("functions/report/main.py").exists());
    assert!(project.path().join("iam/policy.json").exists());
}

#[test]
fn new_refuses_overwrite_without_force() {
    let home = temp_home();
    let project = tempfile::tempdir().unwrap();
    let run = |extra: &[&str]| {
        let mut args = vec!["functions", "new", "report", "--bucket", "artifacts"];
        args.extend_from_slice(extra);
        crondeck_bin(home.path())
            .current_dir(project.path())
            .args(&args)
            .output()
            .unwrap()
    };

    assert!(run(&[]).status.success());
    let second = run(&[]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));
    assert!(run(&["--force"]).status.success());
}

#[test]
fn events_load_missing_file_exits_with_declaration_code() {
    let home = temp_home();
    let project = tempfile::tempdir().unwrap();
    let output = crondeck_bin(home.path())
        .current_dir(project.path())
        .args(["events", "load"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn completions_generate_for_bash() {
    let home = temp_home();
    let output = crondeck_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("crondeck"), "completions must name the binary");
}
