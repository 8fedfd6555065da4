//! mw-orchestrator: the mcwarden daemon
//!
//! The daemon owns every server process it starts. It serves lifecycle
//! requests from the CLI over a localhost IPC socket and talks to the
//! servers themselves over RCON and the status handshake.

pub mod daemon;
pub mod ipc;
pub mod lifecycle;
pub mod process;
pub mod rcon;
pub mod state;
pub mod status;
pub mod tunnel;

pub use lifecycle::Orchestrator;
pub use state::DaemonState;
