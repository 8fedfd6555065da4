//! Error types for mcwarden

use std::path::PathBuf;

use mw_protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ServerName, ServerState};

/// Errors returned by lifecycle operations on a named server
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Start requested while a live process is registered for the name
    #[error("Server '{0}' is already running")]
    AlreadyRunning(ServerName),

    /// Stop requested with no live process for the name
    #[error("Server '{0}' is not running")]
    NotRunning(ServerName),

    /// Name not present in the registry
    #[error("No server named '{0}' in the registry")]
    MissingRegistryEntry(ServerName),

    /// Start script does not exist on disk
    #[error("Start script for '{name}' not found: {}", .path.display())]
    MissingScript { name: ServerName, path: PathBuf },

    /// The OS refused to create the server process
    #[error("Failed to start '{name}': {source}")]
    Spawn {
        name: ServerName,
        #[source]
        source: ProcessError,
    },

    /// The process tree could not be killed; state is ambiguous
    #[error("Failed to kill '{name}' (pid {pid}, state {state}): {source}")]
    ForceKillFailed {
        name: ServerName,
        pid: u32,
        state: ServerState,
        #[source]
        source: ProcessError,
    },

    /// The status handshake returned something unparseable
    #[error("Status query for '{name}' failed: {source}")]
    Probe {
        name: ServerName,
        #[source]
        source: ProbeError,
    },

    /// Registry could not be read or written
    #[error("Registry error: {0}")]
    Registry(#[from] ConfigError),
}

/// Coarse classification of a [`LifecycleError`], carried over IPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AlreadyRunning,
    NotRunning,
    MissingRegistryEntry,
    MissingScript,
    SpawnFailed,
    ForceKillFailed,
    ProbeFailed,
    Registry,
    /// Anything outside the lifecycle taxonomy (bad request, tunnel, I/O)
    Other,
}

impl LifecycleError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            LifecycleError::NotRunning(_) => ErrorKind::NotRunning,
            LifecycleError::MissingRegistryEntry(_) => ErrorKind::MissingRegistryEntry,
            LifecycleError::MissingScript { .. } => ErrorKind::MissingScript,
            LifecycleError::Spawn { .. } => ErrorKind::SpawnFailed,
            LifecycleError::ForceKillFailed { .. } => ErrorKind::ForceKillFailed,
            LifecycleError::Probe { .. } => ErrorKind::ProbeFailed,
            LifecycleError::Registry(_) => ErrorKind::Registry,
        }
    }

    /// Whether the user can fix this by changing configuration or retrying
    /// later, as opposed to needing manual intervention on the host
    pub fn is_user_correctable(&self) -> bool {
        !matches!(
            self,
            LifecycleError::Spawn { .. } | LifecycleError::ForceKillFailed { .. }
        )
    }
}

/// Remote console errors
#[derive(Error, Debug)]
pub enum RconError {
    /// Server rejected the password
    #[error("RCON authentication failed")]
    AuthenticationFailed,

    /// Endpoint unreachable
    #[error("Could not connect to RCON at {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// No answer within the I/O timeout
    #[error("RCON at {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Server closed the session mid-exchange
    #[error("RCON connection closed before a response arrived")]
    ConnectionClosed,

    /// Malformed framing or unexpected packet
    #[error("RCON protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Status handshake errors (an offline server is not one of these)
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Response could not be decoded
    #[error("Malformed status response: {0}")]
    Protocol(#[from] ProtocolError),

    /// Server closed the connection before sending a status response
    #[error("Server closed the connection during the status handshake")]
    ConnectionClosed,

    /// Server answered the status request with the wrong packet
    #[error("Unexpected packet during status handshake: {0}")]
    UnexpectedPacket(String),
}

/// OS process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Program or script does not exist
    #[error("Executable not found: {}", .0.display())]
    NotFound(PathBuf),

    /// OS refused to create the process
    #[error("Failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Kill request failed
    #[error("Failed to kill process tree of pid {pid}: {message}")]
    Kill { pid: u32, message: String },

    /// Kill was sent but the process did not exit in time
    #[error("Process {pid} still alive after kill")]
    StillAlive { pid: u32 },
}

/// Tunnel supervisor errors
#[derive(Error, Debug)]
pub enum TunnelError {
    /// No tunnel program configured
    #[error("No tunnel program configured")]
    NotConfigured,

    /// Tunnel process could not be started
    #[error("Failed to start tunnel: {0}")]
    Spawn(#[source] ProcessError),

    /// Tunnel process died before it settled
    #[error("Tunnel (pid {pid}) exited during startup with code {code:?}")]
    ExitedEarly { pid: u32, code: Option<i32> },

    /// Tunnel process could not be stopped
    #[error("Failed to stop tunnel: {0}")]
    Kill(#[source] ProcessError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Registry JSON error
    #[error("Registry JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
