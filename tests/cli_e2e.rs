//! End-to-end CLI tests for the refcrawl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn refcrawl() -> Command {
    let mut cmd = Command::cargo_bin("refcrawl").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("OPENALEX_EMAIL");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    refcrawl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("citation graph"))
        .stdout(predicate::str::contains("--min-citations"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    refcrawl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("refcrawl"));
}

/// Test that a missing seed is a usage error.
#[test]
fn test_binary_without_seed_fails() {
    refcrawl()
        .assert()
        .failure()
        .stderr(predicate::str::contains("<SEED>"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    refcrawl()
        .args(["W1", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that out-of-range depth is rejected by the parser.
#[test]
fn test_binary_depth_out_of_range_rejected() {
    refcrawl()
        .args(["W1", "--depth", "11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--depth"));
}

/// Test that an invalid config file value exits with the config status.
#[test]
fn test_binary_invalid_config_value_exits_with_config_status() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "max_workers = 0\n").unwrap();

    refcrawl()
        .arg("W1")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid config value"));
}

/// Test that an unknown config key exits with the config status.
#[test]
fn test_binary_unknown_config_key_exits_with_config_status() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "max_wrokers = 4\n").unwrap();

    refcrawl()
        .arg("W1")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid config file"));
}

/// Test that a missing explicit config file exits with the config status.
#[test]
fn test_binary_missing_config_file_exits_with_config_status() {
    let dir = TempDir::new().unwrap();

    refcrawl()
        .arg("W1")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(2);
}

/// Test that an unreachable catalog fails the run with the failure status.
#[test]
fn test_binary_unreachable_catalog_exits_with_failure_status() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "openalex_base_url = \"http://127.0.0.1:9\"\n\
         semantic_scholar_base_url = \"http://127.0.0.1:9\"\n\
         primary_attempts = 1\n\
         connect_timeout_secs = 1\n\
         read_timeout_secs = 1\n",
    )
    .unwrap();

    refcrawl()
        .current_dir(dir.path())
        .args(["a title that cannot be searched", "--cache", "", "--map-cache", ""])
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not resolve seed"));
}
