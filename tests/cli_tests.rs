//! Integration tests for the execgraph command line
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TASKWAIT_TRACE: &str = "tests/fixtures/taskwait.jsonl";
const UNBALANCED_TRACE: &str = "tests/fixtures/unbalanced.jsonl";

#[test]
fn test_summary_is_default_format() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg(TASKWAIT_TRACE);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("chunks: 5"))
        .stdout(predicate::str::contains("tasks: 4"))
        .stdout(predicate::str::contains("taskwait"));
}

#[test]
fn test_json_output_parses() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("--format").arg("json").arg(TASKWAIT_TRACE);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["format"], "execgraph-json-v1");
    assert!(parsed["vertices"].is_array());
    assert!(parsed["tasks"].is_array());
    assert_eq!(parsed["summary"]["taskwait_edges"], 1);
    assert_eq!(parsed["summary"]["chunks"]["parallel"], 2);
    assert_eq!(parsed["summary"]["regions"]["parallel"], 1);

    let edges = parsed["edges"].as_array().unwrap();
    assert_eq!(
        edges.iter().filter(|e| e["kind"] == "taskwait").count(),
        1,
        "Exactly one taskwait edge expected"
    );
}

#[test]
fn test_dot_output() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("--format").arg("dot").arg(TASKWAIT_TRACE);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("digraph execution {"))
        .stdout(predicate::str::contains("->"))
        .stdout(predicate::str::contains("region=\"taskwait\""));
}

#[test]
fn test_output_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.dot");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("--format")
        .arg("dot")
        .arg("-o")
        .arg(&path)
        .arg(TASKWAIT_TRACE);

    cmd.assert().success().stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("digraph execution {"));
}

#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("execgraph.toml");
    fs::write(&config, "collapse_degenerate_pairs = false\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("--format")
        .arg("json")
        .arg("--config")
        .arg(&config)
        .arg(TASKWAIT_TRACE);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let loops = parsed["vertices"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["region_kind"] == "loop")
        .count();
    assert_eq!(loops, 2, "Loop enter and leave should stay separate");
}

#[test]
fn test_config_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("execgraph.toml");
    fs::write(&config, "containment = \"strict\"\nmerge_everything = true\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("--config").arg(&config).arg(TASKWAIT_TRACE);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("merge_everything"));
}

#[test]
fn test_missing_trace_file() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg("does/not/exist.jsonl");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open trace file"));
}

#[test]
fn test_unbalanced_trace_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg(UNBALANCED_TRACE);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("structural mismatch"));
}

#[test]
fn test_malformed_line_reports_line_number() {
    let dir = TempDir::new().unwrap();
    let trace = dir.path().join("bad.jsonl");
    fs::write(
        &trace,
        "{\"record\":\"event\",\"location\":0,\"time\":1,\"kind\":\"enter\",\"region_kind\":\"initial_task\",\"unique_id\":1}\nnot json\n",
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.arg(&trace);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_requires_trace_argument() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execgraph");
    cmd.assert().failure();
}
