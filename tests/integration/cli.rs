//! Smoke tests for the `keel` binary.
//!
//! Parsing and error-reporting behavior only; the full pipeline is covered
//! by the mock-runner flows. Nothing here requires terraform or network
//! access: the catalog is loaded before the tool preflight, so a bad
//! catalog path fails identically on any machine.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn keel() -> Command {
    Command::cargo_bin("keel").expect("keel binary must build")
}

#[test]
fn test_help_lists_the_commands() {
    keel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("teardown"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_version_flag() {
    keel()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("keel"));
}

#[test]
fn test_provision_requires_score_and_catalog() {
    keel()
        .arg("provision")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--score"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    keel()
        .args(["--verbose", "--quiet", "preview", "--score", "s.yaml", "--catalog", "c.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_catalog_file_reports_an_error() {
    let temp = TempDir::new().unwrap();
    keel()
        .args([
            "provision",
            "--score",
            temp.path().join("score.yaml").to_str().unwrap(),
            "--catalog",
            temp.path().join("absent.toml").to_str().unwrap(),
        ])
        .env("KEEL_DATA_DIR", temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_malformed_catalog_reports_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let catalog = temp.path().join("catalog.toml");
    std::fs::write(&catalog, "[[templates]\nname = ").unwrap();

    keel()
        .args([
            "preview",
            "--score",
            temp.path().join("score.yaml").to_str().unwrap(),
            "--catalog",
            catalog.to_str().unwrap(),
        ])
        .env("KEEL_DATA_DIR", temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("catalog"));
}

#[test]
fn test_unknown_subcommand_fails() {
    keel().arg("deploy").assert().failure();
}
