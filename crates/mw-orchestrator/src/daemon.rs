//! Daemon entry point shared by `mw-orchestrator` and `mcwarden serve`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use mw_core::config::DaemonConfig;
use mw_core::pidfile::{self, PidFileGuard};

use crate::ipc::IpcServer;
use crate::state::DaemonState;

/// Run the daemon until `cancel` fires (signal or IPC `shutdown`)
///
/// Managed servers and the tunnel are left running when the daemon exits.
pub async fn run_daemon(config: DaemonConfig, pid_path: PathBuf, cancel: CancellationToken) -> Result<()> {
    if let Some(pid) = pidfile::running_daemon(&pid_path)
        .with_context(|| format!("Failed to read PID file {}", pid_path.display()))?
    {
        bail!("mcwarden daemon is already running (PID {})", pid);
    }
    let _pid_guard = PidFileGuard::acquire(pid_path, std::process::id())
        .context("Failed to write PID file")?;

    let ipc_address = config.ipc_address();
    let state = Arc::new(DaemonState::from_config(config));

    tracing::info!("mcwarden daemon starting (PID {})", std::process::id());

    IpcServer::new(ipc_address, state)
        .with_shutdown_token(cancel)
        .run()
        .await?;

    tracing::info!("Daemon shutdown complete; managed servers keep running");
    Ok(())
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
pub fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel.cancel();
    });
}
