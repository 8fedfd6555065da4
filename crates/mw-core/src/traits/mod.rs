//! Seams between the orchestrator and the outside world

mod console;
mod probe;
mod process;

pub use console::ConsoleClient;
pub use probe::StatusProbe;
pub use process::{LaunchSpec, ManagedProcess, ProcessLauncher, WaitOutcome};
