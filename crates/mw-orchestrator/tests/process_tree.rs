//! Forced kill reaches the whole process tree
//!
//! Linux only: liveness of the grandchild is read from /proc so that a
//! zombie left for a non-reaping init still counts as dead.

#![cfg(target_os = "linux")]

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use mw_core::traits::{LaunchSpec, ManagedProcess, ProcessLauncher};
use mw_orchestrator::process::SystemLauncher;

fn is_running(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // Field 3 is the state; skip past the parenthesised command name
        Ok(stat) => match stat.rsplit_once(')') {
            Some((_, rest)) => !rest.trim_start().starts_with('Z'),
            None => true,
        },
        Err(_) => false,
    }
}

async fn wait_for_file(path: &Path) -> String {
    for _ in 0..100 {
        if let Ok(content) = fs::read_to_string(path) {
            if content.ends_with('\n') {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never appeared", path.display());
}

#[tokio::test]
async fn test_force_kill_takes_grandchildren() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("start.sh");
    fs::write(
        &script,
        "sleep 60 &\necho $! > grandchild.pid\nsleep 60\n",
    )
    .unwrap();

    let launcher = SystemLauncher::new(Duration::from_secs(5));
    let handle = launcher
        .spawn(&LaunchSpec::script(script, dir.path().to_path_buf()))
        .await
        .unwrap();

    let grandchild: u32 = wait_for_file(&dir.path().join("grandchild.pid"))
        .await
        .trim()
        .parse()
        .unwrap();
    assert!(is_running(grandchild));

    handle.force_kill().await.unwrap();
    assert!(!handle.is_alive());

    let mut gone = false;
    for _ in 0..100 {
        if !is_running(grandchild) {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "grandchild {} survived the kill", grandchild);
}
