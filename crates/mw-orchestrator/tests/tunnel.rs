//! Tunnel supervisor behaviour

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::FakeLauncher;
use mw_core::config::TunnelConfig;
use mw_core::traits::ManagedProcess;
use mw_core::{TunnelError, TunnelState};
use mw_orchestrator::tunnel::{TunnelStart, TunnelStop, TunnelSupervisor};

fn supervisor(launcher: &Arc<FakeLauncher>) -> Arc<TunnelSupervisor> {
    let config = TunnelConfig {
        program: Some("playit".into()),
        args: vec!["--secret-path".to_string(), "playit.toml".to_string()],
        ..TunnelConfig::default()
    };
    Arc::new(TunnelSupervisor::new(config, launcher.clone()))
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_ensure_spawns_once() {
    let launcher = FakeLauncher::new();
    let tunnel = supervisor(&launcher);

    let (a, b) = tokio::join!(tunnel.ensure_started(), tunnel.ensure_started());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(launcher.spawn_count(), 1);
    let pid = launcher.last().pid();
    let mut outcomes = vec![a, b];
    outcomes.sort_by_key(|o| matches!(o, TunnelStart::AlreadyRunning { .. }));
    assert_eq!(
        outcomes,
        vec![TunnelStart::Started { pid }, TunnelStart::AlreadyRunning { pid }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ensure_waits_for_settle() {
    let launcher = FakeLauncher::new();
    let tunnel = supervisor(&launcher);

    let ensure = tokio::spawn({
        let tunnel = Arc::clone(&tunnel);
        async move { tunnel.ensure_started().await }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(tunnel.state(), TunnelState::Starting);

    let outcome = ensure.await.unwrap().unwrap();
    let pid = launcher.last().pid();
    assert_eq!(outcome, TunnelStart::Started { pid });
    assert_eq!(tunnel.state(), TunnelState::Running { pid });
    assert_eq!(
        launcher.last_spec().args,
        vec!["--secret-path".to_string(), "playit.toml".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_stop_again() {
    let launcher = FakeLauncher::new();
    let tunnel = supervisor(&launcher);
    tunnel.ensure_started().await.unwrap();
    let pid = launcher.last().pid();

    assert_eq!(tunnel.stop().await.unwrap(), TunnelStop::Stopped { pid });
    assert_eq!(launcher.last().kill_count(), 1);
    assert_eq!(tunnel.state(), TunnelState::Absent);

    assert_eq!(tunnel.stop().await.unwrap(), TunnelStop::NotRunning);
    assert_eq!(launcher.last().kill_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dead_tunnel_is_respawned() {
    let launcher = FakeLauncher::new();
    let tunnel = supervisor(&launcher);
    tunnel.ensure_started().await.unwrap();
    launcher.last().exit();

    assert_eq!(tunnel.state(), TunnelState::Absent);
    let outcome = tunnel.ensure_started().await.unwrap();
    assert!(matches!(outcome, TunnelStart::Started { .. }));
    assert_eq!(launcher.spawn_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_tunnel_dying_during_settle_is_an_error() {
    let launcher = FakeLauncher::new();
    launcher.exit_immediately.store(true, Ordering::SeqCst);
    let tunnel = supervisor(&launcher);

    let err = tunnel.ensure_started().await.unwrap_err();
    assert!(matches!(err, TunnelError::ExitedEarly { .. }));
    assert_eq!(tunnel.state(), TunnelState::Absent);
}

#[tokio::test(start_paused = true)]
async fn test_failed_kill_keeps_tunnel_tracked() {
    let launcher = FakeLauncher::new();
    launcher.kill_fails.store(true, Ordering::SeqCst);
    let tunnel = supervisor(&launcher);
    tunnel.ensure_started().await.unwrap();

    assert!(matches!(tunnel.stop().await, Err(TunnelError::Kill(_))));
    assert!(matches!(tunnel.state(), TunnelState::Running { .. }));
}

#[tokio::test]
async fn test_unconfigured_tunnel() {
    let launcher = FakeLauncher::new();
    let tunnel = TunnelSupervisor::new(TunnelConfig::default(), launcher.clone());

    assert!(!tunnel.is_configured());
    assert!(matches!(
        tunnel.ensure_started().await,
        Err(TunnelError::NotConfigured)
    ));
    assert_eq!(launcher.spawn_count(), 0);
}
