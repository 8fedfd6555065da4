//! mw-cli: Command-line interface for mcwarden
//!
//! Provides the `mcwarden` CLI for running the daemon and managing
//! Minecraft servers through it.

pub mod commands;
pub mod ipc;
pub mod output;
