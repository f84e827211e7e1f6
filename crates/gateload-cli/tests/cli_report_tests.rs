//! Integration tests for `gateload md` and `gateload github-annotations`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn gateload() -> Command {
    Command::cargo_bin("gateload").expect("failed to find gateload binary")
}

#[test]
fn md_renders_failing_summary_to_stdout() {
    gateload()
        .arg("md")
        .arg("--summary")
        .arg(fixture("summary_fail.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("❌ gateload: fail"))
        .stdout(predicate::str::contains("| threshold | expression | observed | status |"))
        .stdout(predicate::str::contains(
            "`checks{scenario:default,name:CreateUser}`",
        ))
        .stdout(predicate::str::contains("User Creation - Status is 201"))
        .stdout(predicate::str::contains("**Notes:**"));
}

#[test]
fn md_writes_to_out_file() {
    let dir = tempdir().expect("failed to create temp dir");
    let out = dir.path().join("summary.md");

    gateload()
        .arg("md")
        .arg("--summary")
        .arg(fixture("summary_fail.json"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let md = fs::read_to_string(&out).expect("markdown file should exist");
    assert!(md.starts_with("❌ gateload: fail"));
    assert!(md.contains("`auth`"));
}

#[test]
fn annotations_cover_thresholds_and_checks() {
    gateload()
        .arg("github-annotations")
        .arg("--summary")
        .arg(fixture("summary_fail.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "::error::gateload auth: threshold checks{scenario:default,name:CreateUser} 'rate>0.95' crossed (observed 0.7500)",
        ))
        .stdout(predicate::str::contains(
            "::error::gateload auth: check 'User Creation - Status is 201' failed 10 of 40",
        ))
        .stdout(predicate::str::contains("LoginUser").not());
}

#[test]
fn md_missing_summary_is_a_tool_error() {
    let dir = tempdir().expect("failed to create temp dir");

    gateload()
        .arg("md")
        .arg("--summary")
        .arg(dir.path().join("nope.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read"));
}

#[test]
fn md_rejects_non_summary_json() {
    let dir = tempdir().expect("failed to create temp dir");
    let bogus = dir.path().join("bogus.json");
    fs::write(&bogus, r#"{"hello": "world"}"#).unwrap();

    gateload()
        .arg("md")
        .arg("--summary")
        .arg(&bogus)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("parse json"));
}
