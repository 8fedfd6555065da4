//! Process traits

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProcessError;

/// What to run and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Run a start script inside its server directory
    pub fn script(script_path: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            program: script_path,
            args: Vec::new(),
            working_dir: Some(working_dir),
        }
    }

    /// Run a program with arguments in the daemon's directory
    pub fn program(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            working_dir: None,
        }
    }
}

/// Result of waiting on a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Exited, with its exit code when the OS reported one
    Exited(Option<i32>),
    TimedOut,
}

/// A spawned OS process owned by the daemon
#[async_trait]
pub trait ManagedProcess: Send + Sync {
    /// OS process id
    fn pid(&self) -> u32;

    /// Non-blocking liveness check
    fn is_alive(&self) -> bool;

    /// Wait for exit, suspending only the calling task
    async fn wait(&self, timeout: Duration) -> WaitOutcome;

    /// Kill the process and all of its descendants
    ///
    /// Killing a process that has already exited is a no-op.
    async fn force_kill(&self) -> Result<(), ProcessError>;
}

/// Creates [`ManagedProcess`]es
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<Arc<dyn ManagedProcess>, ProcessError>;
}
