use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn missing_subcommand_prints_usage() {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn single_weave_requires_source() {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd.args(["weave", "--source-type", "Foo", "--target", "t.dll", "--target-type", "Bar", "--out", "o.dll"]).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("--source"), "stderr: {stderr}");
}

#[test]
fn config_and_single_flags_are_mutually_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("weave.toml");
    std::fs::write(&config_path, "source = \"a.dll\"\ntarget = \"b.dll\"\nout = \"c.dll\"\nweaves = []\n").unwrap();

    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .args(["weave", "--config"])
        .arg(&config_path)
        .args(["--source", "a.dll"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("mutually exclusive"), "stderr: {stderr}");
}

#[test]
fn nonexistent_source_assembly_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.dll");

    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .args(["weave", "--source"])
        .arg(&missing)
        .args(["--source-type", "Foo", "--target"])
        .arg(&missing)
        .args(["--target-type", "Bar", "--out", "o.dll"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("weave failed"), "stderr: {stderr}");
}
