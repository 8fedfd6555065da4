//! Global daemon state

use std::sync::Arc;

use mw_core::config::DaemonConfig;
use mw_core::traits::ProcessLauncher;
use mw_core::Registry;

use crate::lifecycle::{Orchestrator, OrchestratorSettings};
use crate::process::SystemLauncher;
use crate::rcon::RconClient;
use crate::status::TcpProber;
use crate::tunnel::TunnelSupervisor;

/// Everything an IPC request handler can reach
pub struct DaemonState {
    /// Configuration
    pub config: DaemonConfig,
    /// Lifecycle orchestrator
    pub orchestrator: Arc<Orchestrator>,
}

impl DaemonState {
    /// Wrap an existing orchestrator
    pub fn new(config: DaemonConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Build the production stack: OS processes, TCP RCON and status pings
    ///
    /// An unreadable registry is logged and replaced by an empty one so the
    /// daemon still comes up and `reload` can fix it later.
    pub fn from_config(config: DaemonConfig) -> Self {
        let registry = match Registry::load(&config.registry_path) {
            Ok(registry) => {
                tracing::info!(
                    count = registry.len(),
                    path = %config.registry_path.display(),
                    "Loaded server registry"
                );
                registry
            }
            Err(e) => {
                tracing::error!(
                    path = %config.registry_path.display(),
                    "Failed to load registry, starting empty: {}",
                    e
                );
                Registry::new()
            }
        };

        let launcher: Arc<dyn ProcessLauncher> =
            Arc::new(SystemLauncher::new(config.kill_confirm_timeout));

        let mut orchestrator = Orchestrator::new(
            registry,
            OrchestratorSettings::from_config(&config),
            Arc::clone(&launcher),
            Arc::new(RconClient::new(config.rcon_timeout)),
            Arc::new(TcpProber::new()),
        );

        if config.tunnel.program.is_some() {
            let tunnel = TunnelSupervisor::new(config.tunnel.clone(), launcher);
            orchestrator = orchestrator.with_tunnel(Arc::new(tunnel));
        } else {
            tracing::debug!("No tunnel program configured");
        }

        if config.rcon_password.is_none() {
            tracing::warn!("No daemon-wide RCON secret; servers without their own will be force-stopped");
        }

        Self::new(config, Arc::new(orchestrator))
    }
}
