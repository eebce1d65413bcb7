//! Smoke tests for the sceno CLI
//!
//! None of these launch a browser: they cover parsing, suite loading,
//! validation and the exit code contract.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command for the sceno binary
fn sceno() -> Command {
    Command::cargo_bin("sceno").expect("sceno binary should exist")
}

fn demo_suite() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/saucedemo.yaml")
}

fn write_suite(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write suite");
    path
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    sceno()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    sceno()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_help() {
    sceno().assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    sceno()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--parallel"))
        .stdout(predicate::str::contains("--reporter"))
        .stdout(predicate::str::contains("--suite-timeout-ms"));
}

// ============================================================================
// Suite Loading Tests
// ============================================================================

#[test]
fn test_validate_demo_suite() {
    sceno()
        .args(["validate", "--suite"])
        .arg(demo_suite())
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_list_demo_suite() {
    sceno()
        .args(["list", "--suite"])
        .arg(demo_suite())
        .assert()
        .success()
        .stdout(predicate::str::contains("saucedemo (5 scenarios)"))
        .stdout(predicate::str::contains("login_valid"))
        .stdout(predicate::str::contains("add_to_cart_badge"));
}

#[test]
fn test_validate_missing_file_exits_2() {
    sceno()
        .args(["validate", "--suite", "/nonexistent/suite.yaml"])
        .assert()
        .code(2);
}

#[test]
fn test_validate_unknown_locator_exits_2() {
    let temp = TempDir::new().expect("create temp dir");
    let suite = write_suite(
        &temp,
        "bad.yaml",
        r#"
version: "1.0"
name: bad
base_url: https://shop.test
pages:
  common:
    locators:
      title: ["h1"]
scenarios:
  - id: a
    steps:
      - { type: click, locator: checkout }
"#,
    );
    sceno()
        .args(["validate", "--suite"])
        .arg(&suite)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("checkout"));
}

#[test]
fn test_run_invalid_suite_exits_2() {
    let temp = TempDir::new().expect("create temp dir");
    let suite = write_suite(&temp, "broken.yaml", "version: \"1.0\"\nname: [oops");
    sceno()
        .args(["run", "--suite"])
        .arg(&suite)
        .assert()
        .code(2);
}

#[test]
fn test_run_zero_parallel_exits_2() {
    sceno()
        .args(["run", "-j", "0", "--suite"])
        .arg(demo_suite())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("parallel"));
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_run_with_no_selected_scenarios_writes_empty_report() {
    let temp = TempDir::new().expect("create temp dir");
    let report = temp.path().join("report.json");
    sceno()
        .args(["run", "--quiet", "--reporter", "json", "--filter", "no_such_scenario"])
        .arg("--suite")
        .arg(demo_suite())
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let body = fs::read_to_string(&report).expect("report written");
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(json["name"], "saucedemo");
    assert_eq!(json["totals"]["passed"], 0);
    assert_eq!(json["scenarios"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_run_junit_to_stdout() {
    sceno()
        .args(["run", "--quiet", "--reporter", "junit", "--filter", "nothing"])
        .arg("--suite")
        .arg(demo_suite())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"<testsuite name="saucedemo" tests="0""#));
}
