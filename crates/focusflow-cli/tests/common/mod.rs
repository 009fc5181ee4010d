//! Common utilities for CLI E2E tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

/// Invoke the CLI with its data directory pointed at `data_dir`.
pub fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusflow"))
        .args(args)
        .env("FOCUSFLOW_DATA_DIR", data_dir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("FOCUSFLOW_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(
        code, 0,
        "CLI command failed with code {code}: {args:?}\nstderr: {stderr}"
    );
    stdout
}

/// Invoke a CLI command and expect failure.
pub fn run_cli_failure(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert!(code != 0, "CLI command unexpectedly succeeded: {args:?}");
    (stdout, stderr, code)
}

/// Run a command and parse its stdout as JSON.
pub fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_cli_success(data_dir, args);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("Failed to parse JSON output of {args:?}: {e}\n{stdout}"))
}

/// Check if string contains substring
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "Expected '{haystack}' to contain '{needle}'"
    );
}
