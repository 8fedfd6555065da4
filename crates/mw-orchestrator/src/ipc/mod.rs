//! IPC server for CLI communication
//!
//! JSON lines over TCP on 127.0.0.1, one response per request.

mod server;

pub use server::IpcServer;
