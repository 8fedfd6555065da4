//! Server lifecycle management

mod orchestrator;

pub use orchestrator::{Orchestrator, OrchestratorSettings, StartOptions, StopOptions};
