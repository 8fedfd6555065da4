//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Default localhost port for CLI ↔ daemon IPC
pub const DEFAULT_IPC_PORT: u16 = 22240;

/// Environment variable holding the daemon-wide RCON secret
pub const RCON_PASSWORD_ENV: &str = "RCON_PASSWORD";

/// Configuration for the mcwarden daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// IPC port on 127.0.0.1
    pub ipc_port: u16,

    /// Location of the server registry (`servers.json`)
    pub registry_path: PathBuf,

    /// RCON secret used for servers without their own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcon_password: Option<String>,

    /// How long to wait for a server to exit after RCON `stop`
    #[serde(with = "duration_secs")]
    pub graceful_stop_timeout: Duration,

    /// Pause between the stop and start halves of a restart
    #[serde(with = "duration_secs")]
    pub restart_cooldown: Duration,

    /// How long a forced kill may take to be confirmed
    #[serde(with = "duration_secs")]
    pub kill_confirm_timeout: Duration,

    /// Status handshake timeout
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,

    /// RCON connect and read timeout
    #[serde(with = "duration_secs")]
    pub rcon_timeout: Duration,

    /// Tunnel process settings
    pub tunnel: TunnelConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ipc_port: DEFAULT_IPC_PORT,
            registry_path: super::default_registry_path(),
            rcon_password: None,
            graceful_stop_timeout: Duration::from_secs(30),
            restart_cooldown: Duration::from_secs(5),
            kill_confirm_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            rcon_timeout: Duration::from_secs(5),
            tunnel: TunnelConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Get the IPC address (localhost:port)
    pub fn ipc_address(&self) -> String {
        format!("127.0.0.1:{}", self.ipc_port)
    }

    /// Fill the RCON secret from the environment when the file has none
    pub fn with_env_overrides(mut self) -> Self {
        if self.rcon_password.is_none() {
            self.rcon_password = std::env::var(RCON_PASSWORD_ENV)
                .ok()
                .filter(|s| !s.is_empty());
        }
        self
    }
}

/// Tunnel process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Tunnel executable (e.g. the playit agent); no tunnel when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,

    /// Extra arguments for the tunnel executable
    pub args: Vec<String>,

    /// Time the tunnel needs after launch before its endpoint is usable
    #[serde(with = "duration_secs")]
    pub settle: Duration,

    /// Ensure the tunnel whenever a server starts
    pub start_with_server: bool,

    /// Tear the tunnel down on a full stop (never on restart)
    pub stop_with_server: bool,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            settle: Duration::from_secs(10),
            start_with_server: false,
            stop_with_server: true,
        }
    }
}
