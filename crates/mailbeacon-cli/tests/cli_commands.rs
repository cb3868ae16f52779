// crates/mailbeacon-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that run the `mailbeacon` binary.
// Purpose: Validate config tooling, identity derivation, and error exits.
// Dependencies: mailbeacon-cli binary, mailbeacon-config, mailbeacon-core, tempfile
// ============================================================================

//! ## Overview
//! Spawns the compiled binary and checks exit status and output. The `serve`
//! command is covered by a config failure case only; the HTTP surface is
//! exercised by the server crate's tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use mailbeacon_config::MailBeaconConfig;
use mailbeacon_core::derive_identity;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn mailbeacon_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mailbeacon"))
}

fn run(args: &[&str]) -> Output {
    Command::new(mailbeacon_bin())
        .args(args)
        .env_remove("MAILBEACON_LANG")
        .env_remove("MAILBEACON_CONFIG")
        .output()
        .expect("run mailbeacon")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).expect("utf-8 stderr")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_example_is_valid_config() {
    let output = run(&["config", "example"]);
    assert!(output.status.success());
    MailBeaconConfig::from_toml_str(&stdout(&output)).expect("example parses");
}

#[test]
fn config_validate_accepts_example_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mailbeacon.toml");
    fs::write(&path, stdout(&run(&["config", "example"]))).unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "Config validated successfully.");
}

#[test]
fn config_validate_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mailbeacon.toml");
    fs::write(&path, "[rate_limit]\nwindow_ms = 5\n").unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("Failed to load config:"));
}

#[test]
fn identity_derive_prints_identity() {
    let output =
        run(&["identity", "derive", "--subject", "Q3 Report", "--recipient", "a@x.com"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), derive_identity("Q3 Report", "a@x.com").as_str());
}

#[test]
fn identity_derive_uses_placeholders_for_blank_input() {
    let output = run(&["identity", "derive"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), derive_identity("", "").as_str());
}

#[test]
fn serve_fails_on_missing_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let output = run(&["serve", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("Failed to load config:"));
}

#[test]
fn version_flag_prints_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), format!("mailbeacon {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn invalid_lang_env_fails() {
    let output = Command::new(mailbeacon_bin())
        .args(["identity", "derive"])
        .env("MAILBEACON_LANG", "xx")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("MAILBEACON_LANG"));
}
