//! Tunnel supervisor
//!
//! There is at most one tunnel process, shared by every server. Its lifetime
//! is independent of any single server: starting a server may ensure it,
//! and only an explicit stop (or a full server stop with teardown enabled)
//! ends it.
//!
//! # Locking
//!
//! `gate` is held across spawn and settle, so concurrent `ensure_started`
//! calls collapse into one spawn and `stop` cannot interleave with a start
//! in progress. `slot` is only held for short synchronous reads and writes,
//! so `state()` never waits on a settling tunnel.

use std::sync::{Arc, Mutex, MutexGuard};

use mw_core::config::TunnelConfig;
use mw_core::report::TunnelEvent;
use mw_core::traits::{LaunchSpec, ManagedProcess, ProcessLauncher, WaitOutcome};
use mw_core::{TunnelError, TunnelState};

/// Outcome of [`TunnelSupervisor::ensure_started`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelStart {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
}

/// Outcome of [`TunnelSupervisor::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelStop {
    Stopped { pid: u32 },
    NotRunning,
}

impl From<TunnelStart> for TunnelEvent {
    fn from(start: TunnelStart) -> Self {
        match start {
            TunnelStart::Started { pid } => TunnelEvent::Started { pid },
            TunnelStart::AlreadyRunning { pid } => TunnelEvent::AlreadyRunning { pid },
        }
    }
}

impl From<TunnelStop> for TunnelEvent {
    fn from(stop: TunnelStop) -> Self {
        match stop {
            TunnelStop::Stopped { pid } => TunnelEvent::Stopped { pid },
            TunnelStop::NotRunning => TunnelEvent::NotRunning,
        }
    }
}

enum Slot {
    Absent,
    Starting,
    Running(Arc<dyn ManagedProcess>),
}

/// Owns the tunnel process
pub struct TunnelSupervisor {
    config: TunnelConfig,
    launcher: Arc<dyn ProcessLauncher>,
    slot: Mutex<Slot>,
    gate: tokio::sync::Mutex<()>,
}

impl TunnelSupervisor {
    /// Create a supervisor; nothing is spawned until [`ensure_started`](Self::ensure_started)
    pub fn new(config: TunnelConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config,
            launcher,
            slot: Mutex::new(Slot::Absent),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether a tunnel program is configured
    pub fn is_configured(&self) -> bool {
        self.config.program.is_some()
    }

    /// Current tunnel state; a dead tunnel reads as absent
    pub fn state(&self) -> TunnelState {
        let slot = self.slot();
        match &*slot {
            Slot::Absent => TunnelState::Absent,
            Slot::Starting => TunnelState::Starting,
            Slot::Running(process) if process.is_alive() => TunnelState::Running {
                pid: process.pid(),
            },
            Slot::Running(_) => TunnelState::Absent,
        }
    }

    /// Start the tunnel unless a live one exists
    ///
    /// Returns once the settle interval has elapsed after a fresh spawn.
    pub async fn ensure_started(&self) -> Result<TunnelStart, TunnelError> {
        let program = self
            .config
            .program
            .clone()
            .ok_or(TunnelError::NotConfigured)?;

        let _gate = self.gate.lock().await;

        if let Some(pid) = self.live_pid() {
            tracing::debug!(pid, "Tunnel already running");
            return Ok(TunnelStart::AlreadyRunning { pid });
        }

        *self.slot() = Slot::Starting;

        let spec = LaunchSpec::program(program, self.config.args.clone());
        let process = match self.launcher.spawn(&spec).await {
            Ok(process) => process,
            Err(e) => {
                *self.slot() = Slot::Absent;
                return Err(TunnelError::Spawn(e));
            }
        };
        let pid = process.pid();

        tracing::info!(
            pid,
            settle_secs = self.config.settle.as_secs(),
            "Tunnel spawned, waiting for it to settle"
        );
        if let WaitOutcome::Exited(code) = process.wait(self.config.settle).await {
            *self.slot() = Slot::Absent;
            return Err(TunnelError::ExitedEarly { pid, code });
        }

        *self.slot() = Slot::Running(process);
        tracing::info!(pid, "Tunnel running");
        Ok(TunnelStart::Started { pid })
    }

    /// Kill the tunnel process tree
    pub async fn stop(&self) -> Result<TunnelStop, TunnelError> {
        let _gate = self.gate.lock().await;

        let process = match std::mem::replace(&mut *self.slot(), Slot::Absent) {
            Slot::Running(process) if process.is_alive() => process,
            _ => return Ok(TunnelStop::NotRunning),
        };
        let pid = process.pid();

        if let Err(e) = process.force_kill().await {
            tracing::error!(pid, "Failed to stop tunnel: {}", e);
            *self.slot() = Slot::Running(process);
            return Err(TunnelError::Kill(e));
        }

        tracing::info!(pid, "Tunnel stopped");
        Ok(TunnelStop::Stopped { pid })
    }

    fn live_pid(&self) -> Option<u32> {
        let mut slot = self.slot();
        let (pid, alive) = match &*slot {
            Slot::Running(process) => (process.pid(), process.is_alive()),
            _ => return None,
        };
        if alive {
            return Some(pid);
        }
        tracing::warn!(pid, "Tunnel found dead");
        *slot = Slot::Absent;
        None
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        // Slot updates are single assignments; a poisoned guard is still consistent
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
