//! mw-core: Shared types, configuration and the server registry for mcwarden
//!
//! This crate holds everything the daemon and the CLI agree on: the server
//! descriptors loaded from the registry, lifecycle reports, the IPC message
//! set, error types, and the traits the orchestrator uses to reach the
//! outside world (processes, RCON, status pings).

pub mod config;
pub mod error;
pub mod ipc;
pub mod pidfile;
pub mod registry;
pub mod report;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{ConfigError, LifecycleError, ProbeError, ProcessError, RconError, TunnelError};
pub use registry::{RconEndpoint, Registry, ServerDescriptor};
pub use types::{ServerName, ServerState, TunnelState};
