//! In-memory stand-ins for processes, RCON and status pings

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use mw_core::report::StatusSnapshot;
use mw_core::traits::{
    ConsoleClient, LaunchSpec, ManagedProcess, ProcessLauncher, StatusProbe, WaitOutcome,
};
use mw_core::{
    ProbeError, ProcessError, RconEndpoint, RconError, Registry, ServerDescriptor, ServerName,
};
use mw_orchestrator::lifecycle::{Orchestrator, OrchestratorSettings};
use mw_orchestrator::tunnel::TunnelSupervisor;

// ---- processes ----

pub struct FakeProcess {
    pid: u32,
    alive: watch::Sender<bool>,
    kills: AtomicUsize,
    kill_fails: bool,
}

impl FakeProcess {
    pub fn exit(&self) {
        self.alive.send_replace(false);
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagedProcess for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let mut rx = self.alive.subscribe();
        // Bound to a local so the watch guard drops before `rx`
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(|alive| !*alive)).await {
            Ok(_) => WaitOutcome::Exited(Some(0)),
            Err(_) => WaitOutcome::TimedOut,
        };
        outcome
    }

    async fn force_kill(&self) -> Result<(), ProcessError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.kill_fails {
            return Err(ProcessError::StillAlive { pid: self.pid });
        }
        self.exit();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    next_pid: AtomicU32,
    processes: Mutex<Vec<Arc<FakeProcess>>>,
    specs: Mutex<Vec<LaunchSpec>>,
    pub fail_spawn: AtomicBool,
    pub kill_fails: AtomicBool,
    /// Spawned processes exit on their own right away
    pub exit_immediately: AtomicBool,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spawn_count(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    pub fn kill_count(&self) -> usize {
        self.processes
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.kill_count())
            .sum()
    }

    pub fn live_count(&self) -> usize {
        self.processes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_alive())
            .count()
    }

    pub fn last(&self) -> Arc<FakeProcess> {
        self.processes
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("nothing spawned")
    }

    pub fn last_spec(&self) -> LaunchSpec {
        self.specs.lock().unwrap().last().cloned().expect("nothing spawned")
    }

    /// Every live process exits, as if told to stop
    pub fn exit_all(&self) {
        for process in self.processes.lock().unwrap().iter() {
            process.exit();
        }
    }

    /// Processes started in `dir` exit
    pub fn exit_in(&self, dir: &Path) {
        let specs = self.specs.lock().unwrap();
        let processes = self.processes.lock().unwrap();
        for (spec, process) in specs.iter().zip(processes.iter()) {
            if spec.working_dir.as_deref() == Some(dir) {
                process.exit();
            }
        }
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<Arc<dyn ManagedProcess>, ProcessError> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }

        let (alive, _) = watch::channel(!self.exit_immediately.load(Ordering::SeqCst));
        let process = Arc::new(FakeProcess {
            pid: 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst),
            alive,
            kills: AtomicUsize::new(0),
            kill_fails: self.kill_fails.load(Ordering::SeqCst),
        });

        self.processes.lock().unwrap().push(Arc::clone(&process));
        self.specs.lock().unwrap().push(spec.clone());
        Ok(process)
    }
}

// ---- console ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    /// `stop` makes every process exit
    Obey,
    /// Commands are accepted but nothing happens
    Ignore,
    /// Every call fails authentication
    Reject,
}

pub struct FakeConsole {
    launcher: Arc<FakeLauncher>,
    /// RCON port → server directory, so `stop` only ends that server
    routes: Mutex<HashMap<u16, PathBuf>>,
    mode: Mutex<ConsoleMode>,
    list_reply: Mutex<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeConsole {
    pub fn new(launcher: Arc<FakeLauncher>) -> Arc<Self> {
        Arc::new(Self {
            launcher,
            routes: Mutex::new(HashMap::new()),
            mode: Mutex::new(ConsoleMode::Obey),
            list_reply: Mutex::new(String::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn route(&self, desc: &ServerDescriptor) {
        self.routes
            .lock()
            .unwrap()
            .insert(desc.rcon.port, desc.path.clone());
    }

    pub fn set_mode(&self, mode: ConsoleMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn set_list_reply(&self, reply: &str) {
        *self.list_reply.lock().unwrap() = reply.to_string();
    }

    /// Commands sent, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }

    /// Secrets used, in order
    pub fn secrets(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(secret, _)| secret.clone())
            .collect()
    }
}

#[async_trait]
impl ConsoleClient for FakeConsole {
    async fn execute(
        &self,
        endpoint: &RconEndpoint,
        secret: &str,
        command: &str,
    ) -> Result<String, RconError> {
        self.calls
            .lock()
            .unwrap()
            .push((secret.to_string(), command.to_string()));

        let mode = *self.mode.lock().unwrap();
        match (mode, command) {
            (ConsoleMode::Reject, _) => Err(RconError::AuthenticationFailed),
            (ConsoleMode::Obey, "stop") => {
                let route = self.routes.lock().unwrap().get(&endpoint.port).cloned();
                match route {
                    Some(dir) => self.launcher.exit_in(&dir),
                    None => self.launcher.exit_all(),
                }
                Ok("Stopping the server".to_string())
            }
            (_, "list") => Ok(self.list_reply.lock().unwrap().clone()),
            _ => Ok(String::new()),
        }
    }
}

// ---- status ----

#[derive(Default)]
pub struct FakeProbe {
    snapshot: Mutex<Option<StatusSnapshot>>,
    malformed: AtomicBool,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_online(&self, online: u32, max: u32) {
        *self.snapshot.lock().unwrap() = Some(StatusSnapshot {
            online: true,
            version: Some("1.20.4".to_string()),
            protocol: Some(765),
            players_online: online,
            players_max: max,
            latency_ms: Some(1.5),
            motd: Some("A Minecraft Server".to_string()),
            sample: None,
        });
    }

    pub fn set_malformed(&self) {
        self.malformed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusProbe for FakeProbe {
    async fn probe(&self, _address: &str, _timeout: Duration) -> Result<StatusSnapshot, ProbeError> {
        if self.malformed.load(Ordering::SeqCst) {
            return Err(ProbeError::UnexpectedPacket("Pong(0)".to_string()));
        }
        Ok(self
            .snapshot
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(StatusSnapshot::offline))
    }
}

// ---- harness ----

pub struct Harness {
    pub dir: TempDir,
    pub launcher: Arc<FakeLauncher>,
    /// Separate from `launcher` so an RCON `stop` never takes the tunnel down
    pub tunnel_launcher: Arc<FakeLauncher>,
    pub console: Arc<FakeConsole>,
    pub probe: Arc<FakeProbe>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn settings(dir: &Path, secret: Option<&str>) -> OrchestratorSettings {
    OrchestratorSettings {
        rcon_password: secret.map(String::from),
        graceful_stop_timeout: Duration::from_secs(30),
        restart_cooldown: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(5),
        tunnel_with_start: false,
        tunnel_with_stop: false,
        registry_path: Some(dir.join("servers.json")),
    }
}

/// Registry entry whose start script exists on disk
///
/// Each entry gets its own RCON port so console fakes can tell them apart.
pub fn server_dir(dir: &Path, name: &str) -> ServerDescriptor {
    static NEXT_PORT: AtomicU32 = AtomicU32::new(25575);

    let path = dir.join(name);
    std::fs::create_dir_all(&path).unwrap();
    let mut desc = ServerDescriptor::new(name, path);
    desc.rcon.port = NEXT_PORT.fetch_add(1, Ordering::SeqCst) as u16;
    std::fs::write(desc.script_path(), "#!/bin/sh\n").unwrap();
    desc
}

pub struct HarnessBuilder {
    secret: Option<&'static str>,
    servers: Vec<&'static str>,
    tunnel: Option<Duration>,
    tunnel_with_start: bool,
    tunnel_with_stop: bool,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            secret: Some("hunter2"),
            servers: vec!["survival"],
            tunnel: None,
            tunnel_with_start: false,
            tunnel_with_stop: false,
        }
    }
}

impl HarnessBuilder {
    pub fn secret(mut self, secret: Option<&'static str>) -> Self {
        self.secret = secret;
        self
    }

    pub fn servers(mut self, servers: &[&'static str]) -> Self {
        self.servers = servers.to_vec();
        self
    }

    /// Attach a tunnel with the given settle interval
    pub fn tunnel(mut self, settle: Duration, with_start: bool, with_stop: bool) -> Self {
        self.tunnel = Some(settle);
        self.tunnel_with_start = with_start;
        self.tunnel_with_stop = with_stop;
        self
    }

    pub fn build(self) -> Harness {
        let dir = TempDir::new().unwrap();
        let launcher = FakeLauncher::new();
        let tunnel_launcher = FakeLauncher::new();
        let console = FakeConsole::new(Arc::clone(&launcher));
        let probe = FakeProbe::new();

        let mut registry = Registry::new();
        for name in &self.servers {
            let desc = server_dir(dir.path(), name);
            console.route(&desc);
            registry.insert(desc);
        }

        let mut settings = settings(dir.path(), self.secret);
        settings.tunnel_with_start = self.tunnel_with_start;
        settings.tunnel_with_stop = self.tunnel_with_stop;

        let mut orchestrator = Orchestrator::new(
            registry,
            settings,
            launcher.clone(),
            console.clone(),
            probe.clone(),
        );

        if let Some(settle) = self.tunnel {
            let config = mw_core::config::TunnelConfig {
                program: Some("playit".into()),
                settle,
                ..Default::default()
            };
            orchestrator =
                orchestrator.with_tunnel(Arc::new(TunnelSupervisor::new(config, tunnel_launcher.clone())));
        }

        Harness {
            dir,
            launcher,
            tunnel_launcher,
            console,
            probe,
            orchestrator: Arc::new(orchestrator),
        }
    }
}

pub fn name(s: &str) -> ServerName {
    ServerName::new(s)
}
