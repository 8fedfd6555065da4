//! IPC protocol between the CLI and the daemon
//!
//! JSON messages, one per line, over TCP on 127.0.0.1. Every request gets
//! exactly one response on the same connection.

use serde::{Deserialize, Serialize};

pub use crate::config::DEFAULT_IPC_PORT;
use crate::error::ErrorKind;
use crate::registry::ServerDescriptor;
use crate::report::{
    RestartReport, ServerSummary, StartReport, StatusReport, StopReport, TunnelEvent,
};
use crate::types::TunnelState;

/// Get the default IPC address
pub fn default_ipc_address() -> String {
    format!("127.0.0.1:{}", DEFAULT_IPC_PORT)
}

/// Request from the CLI to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start a server; `ensure_tunnel` overrides the configured policy
    Start {
        name: String,
        ensure_tunnel: Option<bool>,
    },

    /// Stop a server; `stop_tunnel` overrides the configured policy
    Stop {
        name: String,
        stop_tunnel: Option<bool>,
    },

    /// Stop, cool down, start (tunnel untouched)
    Restart { name: String },

    /// Status handshake plus best-effort player list
    Status { name: String },

    /// Every registered or running server
    ListServers,

    /// Add or replace a registry entry and persist it
    Register { descriptor: ServerDescriptor },

    /// Re-read the registry file
    ReloadRegistry,

    /// Ensure the tunnel process is running
    TunnelStart,

    /// Stop the tunnel process
    TunnelStop,

    /// Current tunnel state
    TunnelStatus,

    /// Ping (for liveness)
    Ping,

    /// Shutdown the daemon (managed servers keep running)
    Shutdown,
}

/// Response from the daemon to the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    Started(StartReport),
    Stopped(StopReport),
    Restarted(RestartReport),
    Status(StatusReport),
    Servers { servers: Vec<ServerSummary> },
    Registered { replaced: bool },
    Reloaded { count: usize },
    Tunnel(TunnelEvent),
    TunnelState(TunnelState),

    /// Generic success
    Ok,

    /// Error response
    Error { kind: ErrorKind, message: String },

    /// Pong response
    Pong,
}

impl IpcResponse {
    /// Build an error response outside the lifecycle taxonomy
    pub fn other_error(message: impl Into<String>) -> Self {
        IpcResponse::Error {
            kind: ErrorKind::Other,
            message: message.into(),
        }
    }
}
