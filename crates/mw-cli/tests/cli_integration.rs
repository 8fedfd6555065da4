//! CLI integration tests
//!
//! Tests the mcwarden CLI using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mcwarden() -> Command {
    Command::cargo_bin("mcwarden")
        .expect("Failed to locate mcwarden binary - ensure it's built before running tests")
}

/// Config file pointing the CLI at a port nothing listens on
fn unreachable_daemon_config(dir: &TempDir) -> std::path::PathBuf {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let path = dir.path().join("config.toml");
    std::fs::write(&path, format!("ipc_port = {}\n", port)).unwrap();
    path
}

#[test]
fn test_cli_help() {
    mcwarden()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcwarden"))
        .stdout(predicate::str::contains("Minecraft server lifecycle manager"));
}

#[test]
fn test_cli_version() {
    mcwarden()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcwarden"));
}

#[test]
fn test_cli_serve_help() {
    mcwarden()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn test_cli_stop_help() {
    mcwarden()
        .args(["stop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--with-tunnel"))
        .stdout(predicate::str::contains("--keep-tunnel"));
}

#[test]
fn test_cli_tunnel_help() {
    mcwarden()
        .args(["tunnel", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_cli_unknown_command() {
    mcwarden()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_start_missing_name() {
    mcwarden().arg("start").assert().failure();
}

#[test]
fn test_cli_conflicting_tunnel_flags() {
    mcwarden()
        .args(["start", "survival", "--tunnel", "--no-tunnel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_config_path() {
    mcwarden()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mcwarden"));
}

#[test]
fn test_cli_config_show_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "ipc_port = 30123\nrcon_password = \"hunter2\"\n").unwrap();

    mcwarden()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ipc_port = 30123"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_cli_config_show_missing_explicit_file() {
    let dir = TempDir::new().unwrap();

    mcwarden()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_cli_status_without_daemon() {
    let dir = TempDir::new().unwrap();
    let config = unreachable_daemon_config(&dir);

    mcwarden()
        .arg("--config")
        .arg(&config)
        .args(["status", "survival"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Is it running"));
}

#[test]
fn test_cli_shutdown_without_daemon() {
    let dir = TempDir::new().unwrap();
    let config = unreachable_daemon_config(&dir);

    mcwarden()
        .arg("--config")
        .arg(&config)
        .arg("shutdown")
        .assert()
        .success()
        .stderr(predicate::str::contains("not running"));
}
