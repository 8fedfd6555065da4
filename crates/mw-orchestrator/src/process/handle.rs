//! Spawned process handle
//!
//! Every child is started as the root of its own process tree (a new session
//! on Unix, a new console on Windows) so that a forced kill can take out the
//! JVM and anything it spawned without touching the daemon.
//!
//! A reaper task owns the `Child` and publishes the exit code on a watch
//! channel; everything else only ever reads that channel.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;

use mw_core::traits::{LaunchSpec, ManagedProcess, ProcessLauncher, WaitOutcome};
use mw_core::ProcessError;

/// `None` while running, `Some(code)` once reaped
type ExitSlot = Option<Option<i32>>;

/// Handle to a running child process
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    exit: watch::Receiver<ExitSlot>,
    kill_confirm_timeout: Duration,
}

impl ProcessHandle {
    /// Spawn `spec` with stdio detached
    pub fn spawn(spec: &LaunchSpec, kill_confirm_timeout: Duration) -> Result<Self, ProcessError> {
        let mut command = build_command(spec);

        let mut child = command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ProcessError::NotFound(spec.program.clone())
            } else {
                ProcessError::Spawn {
                    program: spec.program.clone(),
                    source,
                }
            }
        })?;

        let pid = child.id().ok_or_else(|| ProcessError::Spawn {
            program: spec.program.clone(),
            source: io::Error::new(io::ErrorKind::Other, "process exited before its pid was read"),
        })?;

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(pid, "Failed to reap child: {}", e);
                    None
                }
            };
            tracing::debug!(pid, ?code, "Child exited");
            let _ = exit_tx.send(Some(code));
        });

        tracing::info!(pid, program = %spec.program.display(), "Spawned process");

        Ok(Self {
            pid,
            exit: exit_rx,
            kill_confirm_timeout,
        })
    }
}

#[async_trait]
impl ManagedProcess for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }

    async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let mut exit = self.exit.clone();
        // Bound to a local so the watch guard drops before `exit`
        let outcome = match tokio::time::timeout(timeout, exit.wait_for(Option::is_some)).await {
            Ok(Ok(slot)) => WaitOutcome::Exited((*slot).flatten()),
            // Reaper gone without publishing: nothing left to wait for
            Ok(Err(_)) => WaitOutcome::Exited(None),
            Err(_) => WaitOutcome::TimedOut,
        };
        outcome
    }

    async fn force_kill(&self) -> Result<(), ProcessError> {
        if !self.is_alive() {
            return Ok(());
        }

        let pid = self.pid;
        let killed = tokio::task::spawn_blocking(move || kill_tree(pid))
            .await
            .map_err(|e| ProcessError::Kill {
                pid,
                message: e.to_string(),
            })
            .and_then(|result| result);

        if let Err(e) = killed {
            // Lost the race with a natural exit
            if !self.is_alive() {
                return Ok(());
            }
            return Err(e);
        }

        match self.wait(self.kill_confirm_timeout).await {
            WaitOutcome::Exited(_) => {
                tracing::info!(pid, "Process tree killed");
                Ok(())
            }
            WaitOutcome::TimedOut => Err(ProcessError::StillAlive { pid }),
        }
    }
}

/// Launches real OS processes
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    kill_confirm_timeout: Duration,
}

impl SystemLauncher {
    /// Create a launcher whose handles wait `kill_confirm_timeout` after a kill
    pub fn new(kill_confirm_timeout: Duration) -> Self {
        Self {
            kill_confirm_timeout,
        }
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<Arc<dyn ManagedProcess>, ProcessError> {
        let handle = ProcessHandle::spawn(spec, self.kill_confirm_timeout)?;
        Ok(Arc::new(handle))
    }
}

fn build_command(spec: &LaunchSpec) -> Command {
    let mut command = match script_interpreter(&spec.program) {
        Some((shell, flags)) => {
            let mut command = Command::new(shell);
            command.args(flags).arg(&spec.program);
            command
        }
        None => Command::new(&spec.program),
    };

    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    unsafe {
        command.pre_exec(|| {
            // New session: the child's pid becomes its process group id
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    #[cfg(windows)]
    {
        const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
        command.creation_flags(CREATE_NEW_CONSOLE);
    }

    command
}

/// Shell needed to run a script that is not directly executable
#[cfg(unix)]
fn script_interpreter(program: &Path) -> Option<(&'static str, &'static [&'static str])> {
    match program.extension().and_then(|e| e.to_str()) {
        Some("sh") => Some(("sh", &[])),
        _ => None,
    }
}

/// Shell needed to run a script that is not directly executable
#[cfg(windows)]
fn script_interpreter(program: &Path) -> Option<(&'static str, &'static [&'static str])> {
    match program.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("bat") || ext.eq_ignore_ascii_case("cmd") => {
            Some(("cmd", &["/C"]))
        }
        _ => None,
    }
}

#[cfg(unix)]
fn kill_tree(pid: u32) -> Result<(), ProcessError> {
    let result = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if result == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(ProcessError::Kill {
        pid,
        message: err.to_string(),
    })
}

#[cfg(windows)]
fn kill_tree(pid: u32) -> Result<(), ProcessError> {
    let output = std::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .output()
        .map_err(|e| ProcessError::Kill {
            pid,
            message: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ProcessError::Kill {
            pid,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
