//! Tunnel process supervision

mod supervisor;

pub use supervisor::{TunnelStart, TunnelStop, TunnelSupervisor};
