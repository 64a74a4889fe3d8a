//! End-to-end checks of the `strato` binary.
//!
//! None of these need a controller: they cover help output, argument
//! validation that fails before any request, and the target verbs, which
//! only touch the config file.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn strato(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("strato").unwrap();
    cmd.env_remove("STRATO_ENDPOINT")
        .env_remove("STRATO_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_lists_resource_commands() {
    let dir = TempDir::new().unwrap();
    strato(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cluster"))
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("--non-interactive"));
}

#[test]
fn test_wrong_arity_fails_without_server() {
    let dir = TempDir::new().unwrap();
    strato(&dir)
        .args(["-e", "http://127.0.0.1:1", "cluster", "resize", "c-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "wrong number of arguments: expected 2, got 1",
        ));
}

#[test]
fn test_missing_endpoint_is_reported() {
    let dir = TempDir::new().unwrap();
    strato(&dir)
        .args(["tenant", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no endpoint"));
}

#[test]
fn test_target_set_then_show() {
    let dir = TempDir::new().unwrap();
    strato(&dir)
        .args(["target", "set", "https://controller:9000/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Target set to 'https://controller:9000'"));

    strato(&dir)
        .args(["-n", "target", "show"])
        .assert()
        .success()
        .stdout("https://controller:9000\tfalse\t\t\n");

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("endpoint = \"https://controller:9000\""));
}

#[test]
fn test_login_non_interactive_requires_token() {
    let dir = TempDir::new().unwrap();
    strato(&dir)
        .args(["-n", "target", "login"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("access token is required"));

    strato(&dir)
        .args(["-n", "target", "login", "--access-token", "tok"])
        .assert()
        .success();

    strato(&dir)
        .args(["-f", "json", "target", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"logged_in\": true"));
}
