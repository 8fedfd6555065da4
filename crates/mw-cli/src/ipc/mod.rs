//! IPC client for communicating with the daemon
//!
//! Uses TCP on localhost for cross-platform compatibility.

mod client;

pub use client::{DaemonError, WardenClient};

pub use mw_core::ipc::{default_ipc_address, DEFAULT_IPC_PORT};
