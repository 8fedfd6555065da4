//! Lifecycle orchestrator
//!
//! Owns the name → running-process map and drives every state transition:
//!
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//!                                    ↓
//!                                  Forced → Stopped
//! ```
//!
//! # Serialization
//!
//! Start, stop and restart on the same name take that name's mutex for their
//! whole duration; different names never contend. The running map is only
//! mutated under the name's mutex, with one insert per successful start and
//! one remove per confirmed stop, so concurrent readers see either the old
//! entry or the new state, never a gap in between.
//!
//! # Stop phases
//!
//! 1. Graceful: RCON `stop`, then wait for the process to exit. Every failure
//!    here is recorded in the report and falls through.
//! 2. Forced: kill the process tree. Failure here is fatal and leaves the
//!    entry in place in the `Forced` state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use mw_core::config::DaemonConfig;
use mw_core::report::{
    GracefulFailure, PlayerListing, RestartReport, ServerSummary, StartReport, StatusReport,
    StopMode, StopReport, TunnelEvent,
};
use mw_core::time::{current_time_millis, uptime_since};
use mw_core::traits::{ConsoleClient, LaunchSpec, ManagedProcess, ProcessLauncher, StatusProbe, WaitOutcome};
use mw_core::{
    LifecycleError, RconError, Registry, ServerDescriptor, ServerName, ServerState, TunnelError,
    TunnelState,
};

use crate::status::parse_player_list;
use crate::tunnel::TunnelSupervisor;

/// Timeouts, secrets and tunnel policy for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Daemon-wide RCON secret, used when an entry has none
    pub rcon_password: Option<String>,
    pub graceful_stop_timeout: Duration,
    pub restart_cooldown: Duration,
    pub probe_timeout: Duration,
    /// Default for [`StartOptions::ensure_tunnel`]
    pub tunnel_with_start: bool,
    /// Default for [`StopOptions::stop_tunnel`]
    pub tunnel_with_stop: bool,
    /// Registry file for `register` and `reload`; in-memory only when `None`
    pub registry_path: Option<PathBuf>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&DaemonConfig::default())
    }
}

impl OrchestratorSettings {
    /// Settings from the daemon configuration
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            rcon_password: config.rcon_password.clone(),
            graceful_stop_timeout: config.graceful_stop_timeout,
            restart_cooldown: config.restart_cooldown,
            probe_timeout: config.probe_timeout,
            tunnel_with_start: config.tunnel.start_with_server,
            tunnel_with_stop: config.tunnel.stop_with_server,
            registry_path: Some(config.registry_path.clone()),
        }
    }
}

/// Per-call overrides for start
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Ensure the tunnel before spawning; configured default when `None`
    pub ensure_tunnel: Option<bool>,
}

/// Per-call overrides for stop
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOptions {
    /// Stop the tunnel after the server; configured default when `None`
    pub stop_tunnel: Option<bool>,
}

struct RunningServer {
    started_at_ms: u64,
    process: Arc<dyn ManagedProcess>,
}

/// Starts, stops and inspects registered servers
pub struct Orchestrator {
    registry: RwLock<Registry>,
    running: DashMap<ServerName, RunningServer>,
    /// Transitional states; absent means derive from `running`
    phases: DashMap<ServerName, ServerState>,
    locks: DashMap<ServerName, Arc<Mutex<()>>>,
    launcher: Arc<dyn ProcessLauncher>,
    console: Arc<dyn ConsoleClient>,
    probe: Arc<dyn StatusProbe>,
    tunnel: Option<Arc<TunnelSupervisor>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator without a tunnel
    pub fn new(
        registry: Registry,
        settings: OrchestratorSettings,
        launcher: Arc<dyn ProcessLauncher>,
        console: Arc<dyn ConsoleClient>,
        probe: Arc<dyn StatusProbe>,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            running: DashMap::new(),
            phases: DashMap::new(),
            locks: DashMap::new(),
            launcher,
            console,
            probe,
            tunnel: None,
            settings,
        }
    }

    /// Attach a tunnel supervisor
    pub fn with_tunnel(mut self, tunnel: Arc<TunnelSupervisor>) -> Self {
        self.tunnel = Some(tunnel);
        self
    }

    /// Current settings
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    // ---- lifecycle ----

    /// Start a registered server
    pub async fn start(
        &self,
        name: &ServerName,
        options: StartOptions,
    ) -> Result<StartReport, LifecycleError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let ensure_tunnel = options
            .ensure_tunnel
            .unwrap_or(self.settings.tunnel_with_start);
        self.start_locked(name, ensure_tunnel).await
    }

    /// Stop a running server, gracefully if possible
    pub async fn stop(
        &self,
        name: &ServerName,
        options: StopOptions,
    ) -> Result<StopReport, LifecycleError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let stop_tunnel = options.stop_tunnel.unwrap_or(self.settings.tunnel_with_stop);
        self.stop_locked(name, stop_tunnel).await
    }

    /// Stop, wait out the cooldown, start again
    ///
    /// The tunnel is never torn down. If the stop fails nothing is started.
    pub async fn restart(&self, name: &ServerName) -> Result<RestartReport, LifecycleError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let stop = self.stop_locked(name, false).await?;

        let cooldown = self.settings.restart_cooldown;
        tracing::debug!(server = %name, cooldown_secs = cooldown.as_secs(), "Restart cooldown");
        tokio::time::sleep(cooldown).await;

        let start = self
            .start_locked(name, self.settings.tunnel_with_start)
            .await?;

        Ok(RestartReport {
            stop,
            start,
            cooldown_secs: cooldown.as_secs(),
        })
    }

    async fn start_locked(
        &self,
        name: &ServerName,
        ensure_tunnel: bool,
    ) -> Result<StartReport, LifecycleError> {
        if self.live_process(name).is_some() {
            return Err(LifecycleError::AlreadyRunning(name.clone()));
        }

        let descriptor = self.descriptor(name).await?;
        let script = descriptor.script_path();
        if !script.is_file() {
            return Err(LifecycleError::MissingScript {
                name: name.clone(),
                path: script,
            });
        }

        let tunnel = if ensure_tunnel {
            Some(self.ensure_tunnel().await)
        } else {
            None
        };

        self.phases.insert(name.clone(), ServerState::Starting);
        let spec = LaunchSpec::script(script, descriptor.path.clone());
        let process = match self.launcher.spawn(&spec).await {
            Ok(process) => process,
            Err(source) => {
                self.phases.remove(name);
                tracing::error!(server = %name, "Failed to spawn: {}", source);
                return Err(LifecycleError::Spawn {
                    name: name.clone(),
                    source,
                });
            }
        };

        let pid = process.pid();
        let started_at_ms = current_time_millis();
        self.running.insert(
            name.clone(),
            RunningServer {
                started_at_ms,
                process,
            },
        );
        self.phases.remove(name);

        tracing::info!(server = %name, pid, "Server started");
        Ok(StartReport {
            name: name.clone(),
            pid,
            started_at_ms,
            tunnel,
        })
    }

    async fn stop_locked(
        &self,
        name: &ServerName,
        stop_tunnel: bool,
    ) -> Result<StopReport, LifecycleError> {
        let Some(process) = self.live_process(name) else {
            return Err(LifecycleError::NotRunning(name.clone()));
        };
        let pid = process.pid();

        self.phases.insert(name.clone(), ServerState::Stopping);
        let descriptor = self.registry.read().await.get(name).cloned();

        let mode = match self
            .graceful_stop(name, descriptor.as_ref(), process.as_ref())
            .await
        {
            Ok(()) => StopMode::Graceful,
            Err(reason) => {
                tracing::warn!(server = %name, pid, ?reason, "Graceful stop failed, forcing");
                self.phases.insert(name.clone(), ServerState::Forced);

                if let Err(source) = process.force_kill().await {
                    tracing::error!(server = %name, pid, "Forced kill failed: {}", source);
                    return Err(LifecycleError::ForceKillFailed {
                        name: name.clone(),
                        pid,
                        state: ServerState::Forced,
                        source,
                    });
                }
                StopMode::Forced { reason }
            }
        };

        self.running.remove(name);
        self.phases.remove(name);
        tracing::info!(server = %name, pid, ?mode, "Server stopped");

        let tunnel = if stop_tunnel {
            self.stop_tunnel().await
        } else {
            None
        };

        Ok(StopReport {
            name: name.clone(),
            pid,
            mode,
            tunnel,
        })
    }

    async fn graceful_stop(
        &self,
        name: &ServerName,
        descriptor: Option<&ServerDescriptor>,
        process: &dyn ManagedProcess,
    ) -> Result<(), GracefulFailure> {
        let descriptor = descriptor.ok_or(GracefulFailure::Unregistered)?;
        let secret = descriptor
            .effective_secret(self.settings.rcon_password.as_deref())
            .ok_or(GracefulFailure::NoSecret)?;

        match self.console.execute(&descriptor.rcon, secret, "stop").await {
            Ok(reply) => tracing::debug!(server = %name, %reply, "Stop command accepted"),
            // The server may hang up as it goes down; the command was delivered
            Err(RconError::ConnectionClosed) => {
                tracing::debug!(server = %name, "RCON closed after stop command")
            }
            Err(e) => {
                return Err(GracefulFailure::Rcon {
                    message: e.to_string(),
                })
            }
        }

        let timeout = self.settings.graceful_stop_timeout;
        match process.wait(timeout).await {
            WaitOutcome::Exited(code) => {
                tracing::debug!(server = %name, ?code, "Exited after stop command");
                Ok(())
            }
            WaitOutcome::TimedOut => Err(GracefulFailure::TimedOut {
                after_secs: timeout.as_secs(),
            }),
        }
    }

    // ---- queries ----

    /// Status handshake plus a best-effort player list
    ///
    /// An unreachable server is an offline report, not an error.
    pub async fn status(&self, name: &ServerName) -> Result<StatusReport, LifecycleError> {
        let descriptor = self.descriptor(name).await?;

        let snapshot = self
            .probe
            .probe(&descriptor.address, self.settings.probe_timeout)
            .await
            .map_err(|source| LifecycleError::Probe {
                name: name.clone(),
                source,
            })?;

        let players = if !snapshot.online || snapshot.players_online == 0 {
            PlayerListing::NotQueried
        } else {
            match descriptor.effective_secret(self.settings.rcon_password.as_deref()) {
                None => PlayerListing::NotQueried,
                Some(secret) => match self.console.execute(&descriptor.rcon, secret, "list").await {
                    Ok(reply) => parse_player_list(&reply),
                    Err(e) => {
                        tracing::debug!(server = %name, "Player list unavailable: {}", e);
                        PlayerListing::Unavailable {
                            reason: e.to_string(),
                        }
                    }
                },
            }
        };

        Ok(StatusReport {
            name: name.clone(),
            address: descriptor.address.clone(),
            snapshot,
            players,
        })
    }

    /// State of one name
    pub fn state(&self, name: &ServerName) -> ServerState {
        if let Some(phase) = self.phases.get(name) {
            return *phase;
        }
        match self.running.get(name) {
            Some(entry) if entry.process.is_alive() => ServerState::Running,
            _ => ServerState::Stopped,
        }
    }

    /// Pid of the tracked process for `name`, if any
    pub fn running_pid(&self, name: &ServerName) -> Option<u32> {
        self.running.get(name).map(|entry| entry.process.pid())
    }

    /// Every registered server, plus running ones no longer registered
    pub async fn list(&self) -> Vec<ServerSummary> {
        let registry = self.registry.read().await;

        let mut summaries: Vec<ServerSummary> = registry
            .iter()
            .map(|desc| self.summary(&desc.name, Some(desc.address.clone()), true))
            .collect();

        let orphans: Vec<ServerName> = self
            .running
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| !registry.contains(name))
            .collect();
        for name in orphans {
            summaries.push(self.summary(&name, None, false));
        }

        summaries
    }

    fn summary(&self, name: &ServerName, address: Option<String>, registered: bool) -> ServerSummary {
        let state = self.state(name);
        let (pid, uptime_secs) = match self.running.get(name) {
            Some(entry) if state != ServerState::Stopped => (
                Some(entry.process.pid()),
                Some(uptime_since(entry.started_at_ms).as_secs()),
            ),
            _ => (None, None),
        };

        ServerSummary {
            name: name.clone(),
            state,
            pid,
            uptime_secs,
            address,
            registered,
        }
    }

    // ---- registry ----

    /// Insert or replace a registry entry and persist the registry
    ///
    /// Returns true if an entry was replaced. A running server keeps the
    /// process it was started with.
    pub async fn register(&self, descriptor: ServerDescriptor) -> Result<bool, LifecycleError> {
        let mut registry = self.registry.write().await;

        let mut updated = registry.clone();
        let replaced = updated.insert(descriptor.clone()).is_some();
        if let Some(path) = &self.settings.registry_path {
            updated.save(path)?;
        }
        *registry = updated;

        tracing::info!(server = %descriptor.name, replaced, "Registered server");
        Ok(replaced)
    }

    /// Re-read the registry file, returning the number of entries
    pub async fn reload_registry(&self) -> Result<usize, LifecycleError> {
        let mut registry = self.registry.write().await;
        if let Some(path) = &self.settings.registry_path {
            *registry = Registry::load(path)?;
            tracing::info!(count = registry.len(), path = %path.display(), "Registry reloaded");
        }
        Ok(registry.len())
    }

    // ---- tunnel ----

    /// Ensure the tunnel is running
    pub async fn tunnel_start(&self) -> Result<TunnelEvent, TunnelError> {
        let tunnel = self.tunnel.as_ref().ok_or(TunnelError::NotConfigured)?;
        Ok(tunnel.ensure_started().await?.into())
    }

    /// Stop the tunnel
    pub async fn tunnel_stop(&self) -> Result<TunnelEvent, TunnelError> {
        match &self.tunnel {
            Some(tunnel) => Ok(tunnel.stop().await?.into()),
            None => Ok(TunnelEvent::NotRunning),
        }
    }

    /// Current tunnel state
    pub fn tunnel_state(&self) -> TunnelState {
        self.tunnel
            .as_ref()
            .map(|tunnel| tunnel.state())
            .unwrap_or(TunnelState::Absent)
    }

    /// Tunnel failures never block a server start
    async fn ensure_tunnel(&self) -> TunnelEvent {
        match self.tunnel_start().await {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Tunnel not started: {}", e);
                TunnelEvent::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn stop_tunnel(&self) -> Option<TunnelEvent> {
        let tunnel = self.tunnel.as_ref()?;
        Some(match tunnel.stop().await {
            Ok(stop) => stop.into(),
            Err(e) => {
                tracing::warn!("Tunnel not stopped: {}", e);
                TunnelEvent::Failed {
                    reason: e.to_string(),
                }
            }
        })
    }

    // ---- helpers ----

    fn lock_for(&self, name: &ServerName) -> Arc<Mutex<()>> {
        self.locks.entry(name.clone()).or_default().clone()
    }

    async fn descriptor(&self, name: &ServerName) -> Result<ServerDescriptor, LifecycleError> {
        self.registry
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| LifecycleError::MissingRegistryEntry(name.clone()))
    }

    /// Live process for `name`; a dead entry is dropped on the way
    ///
    /// Only called with the name's lock held.
    fn live_process(&self, name: &ServerName) -> Option<Arc<dyn ManagedProcess>> {
        let process = self.running.get(name).map(|entry| entry.process.clone())?;
        if process.is_alive() {
            return Some(process);
        }

        tracing::info!(server = %name, pid = process.pid(), "Dropping dead process entry");
        self.running.remove(name);
        self.phases.remove(name);
        None
    }
}
