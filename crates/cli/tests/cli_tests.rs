//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};

fn labctl(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "labctl", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn write_state(path: &Path) {
    std::fs::write(
        path,
        r#"{
            "clusters": { "c1": { "id": "c1", "labels": [] } },
            "nodes": {
                "c1": [
                    { "id": "n1", "address": "10.0.0.1", "labels": ["region=us", "seeder"] },
                    { "id": "n2", "address": "10.0.0.2", "labels": ["region=us"] },
                    { "id": "n3", "address": "10.0.0.3", "agentPort": 7100, "labels": ["region=eu"] }
                ]
            }
        }"#,
    )
    .unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = labctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("p2p lab benchmarks"), "Should show about text");
    assert!(stdout.contains("query"), "Should show query command");
    assert!(stdout.contains("benchmark"), "Should show benchmark command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = labctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("labctl"), "Should show binary name");
}

/// Test benchmark create subcommand help
#[test]
fn test_benchmark_create_help() {
    let output = labctl(&["benchmark", "create", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Benchmark create help should succeed");
    assert!(stdout.contains("--cluster"), "Should show cluster option");
    assert!(stdout.contains("--scenario"), "Should show scenario option");
    assert!(stdout.contains("--no-reset"), "Should show no-reset flag");
}

/// Test benchmark label subcommand help
#[test]
fn test_benchmark_label_help() {
    let output = labctl(&["benchmark", "label", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Benchmark label help should succeed");
    assert!(stdout.contains("--ids"), "Should show ids option");
    assert!(stdout.contains("--adds"), "Should show adds option");
    assert!(stdout.contains("--removes"), "Should show removes option");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = labctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("LABCTL_CONFIG"), "Should show config env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = labctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = labctl(&["benchmark", "create", "--cluster", "c1"]);
    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test listing benchmarks of an empty lab
#[test]
fn test_list_benchmarks_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();

    let output = labctl(&["--state", state, "benchmark", "list", "--format", "json"]);
    assert!(output.status.success(), "Listing an empty lab should succeed");

    let benchmarks: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(benchmarks, serde_json::json!([]));
}

/// Test querying nodes by label
#[test]
fn test_query_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    write_state(&state);
    let state = state.to_str().unwrap();

    let output = labctl(&[
        "--state",
        state,
        "query",
        "c1",
        "(and 'region=us' (not 'seeder'))",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "Query should succeed");

    let nodes: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let ids: Vec<&str> = nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n2"]);
}

/// Test that a malformed query is reported as a failure
#[test]
fn test_query_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    write_state(&state);
    let state = state.to_str().unwrap();

    let output = labctl(&["--state", state, "query", "c1", "(and 'region=us'"]);
    assert!(!output.status.success(), "Malformed query should fail");
}

/// Test that an unknown benchmark is reported as a failure
#[test]
fn test_report_unknown_benchmark() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();

    let output = labctl(&["--state", state, "benchmark", "report", "missing"]);
    assert!(!output.status.success(), "Unknown benchmark should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing"), "Should name the benchmark");
}
