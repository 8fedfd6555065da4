//! mcwarden CLI
//!
//! Single binary for all mcwarden operations:
//! - Daemon (`serve`), which owns the server processes
//! - Lifecycle commands (start, stop, restart, status, list)
//! - Registry, tunnel and configuration management

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcwarden::commands::{self, RegisterArgs};
use mcwarden::ipc::{DaemonError, WardenClient};
use mcwarden::output::{print_error, print_info, print_success, print_warning};
use mw_core::config::{self, DaemonConfig};
use mw_core::error::ErrorKind;
use mw_core::pidfile;

#[derive(Parser)]
#[command(name = "mcwarden")]
#[command(author, version, about = "Minecraft server lifecycle manager")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon that owns the server processes
    Serve {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,
        /// IPC port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start a registered server
    Start {
        /// Server name
        name: String,
        /// Make sure the tunnel is running first
        #[arg(long, conflicts_with = "no_tunnel")]
        tunnel: bool,
        /// Leave the tunnel alone
        #[arg(long)]
        no_tunnel: bool,
    },

    /// Stop a running server (RCON first, forced kill as fallback)
    Stop {
        /// Server name
        name: String,
        /// Also stop the tunnel
        #[arg(long, conflicts_with = "keep_tunnel")]
        with_tunnel: bool,
        /// Keep the tunnel running
        #[arg(long)]
        keep_tunnel: bool,
    },

    /// Stop, wait for the cooldown, start again (tunnel untouched)
    Restart {
        /// Server name
        name: String,
    },

    /// Ping a server and show version, players and latency
    Status {
        /// Server name
        name: String,
    },

    /// List registered and running servers
    List {
        /// Only show servers with a live process
        #[arg(short, long)]
        running: bool,
    },

    /// Add or replace a server in the registry
    Register(RegisterCli),

    /// Re-read the registry file
    Reload,

    /// Manage the tunnel process
    Tunnel {
        #[command(subcommand)]
        action: TunnelAction,
    },

    /// Ask the daemon to exit (servers keep running)
    Shutdown,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct RegisterCli {
    /// Server name
    name: String,
    /// Server directory (the start script runs here)
    path: PathBuf,
    /// Start script file name inside the server directory
    #[arg(long)]
    script: Option<String>,
    /// Game address used for status pings (host:port)
    #[arg(long)]
    address: Option<String>,
    /// RCON host
    #[arg(long)]
    rcon_host: Option<String>,
    /// RCON port
    #[arg(long)]
    rcon_port: Option<u16>,
    /// RCON secret for this server
    #[arg(long)]
    rcon_password: Option<String>,
}

impl From<RegisterCli> for RegisterArgs {
    fn from(cli: RegisterCli) -> Self {
        Self {
            name: cli.name,
            path: cli.path,
            script: cli.script,
            address: cli.address,
            rcon_host: cli.rcon_host,
            rcon_port: cli.rcon_port,
            rcon_password: cli.rcon_password,
        }
    }
}

#[derive(Subcommand)]
enum TunnelAction {
    /// Start the tunnel if it is not running
    Start,
    /// Stop the tunnel
    Stop,
    /// Show the tunnel state
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a config file with every default
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show config directory path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The daemon logs at info by default, the CLI only warns
    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => default_level,
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Serve { foreground, port } => {
            run_serve(foreground, port, cli.config.as_ref()).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(cli.config.as_ref())?,
            ConfigAction::Init { force } => commands::config_init(cli.config.as_ref(), force)?,
            ConfigAction::Path => commands::config_path(),
        },

        Commands::Shutdown => {
            let mut client = connect_client(cli.config.as_ref())?;
            print_info("Stopping daemon...");
            match client.shutdown().await {
                Ok(()) => print_success("Daemon stopped; servers keep running"),
                Err(e) if e.to_string().contains("Is it running") => {
                    print_warning("Daemon is not running");
                }
                Err(e) => return Err(report(e)),
            }
        }

        command => {
            let mut client = connect_client(cli.config.as_ref())?;
            if let Err(e) = run_client_command(&mut client, command).await {
                return Err(report(e));
            }
        }
    }

    Ok(())
}

async fn run_client_command(client: &mut WardenClient, command: Commands) -> Result<()> {
    match command {
        Commands::Start {
            name,
            tunnel,
            no_tunnel,
        } => commands::start_command(client, &name, tri_state(tunnel, no_tunnel)).await,

        Commands::Stop {
            name,
            with_tunnel,
            keep_tunnel,
        } => commands::stop_command(client, &name, tri_state(with_tunnel, keep_tunnel)).await,

        Commands::Restart { name } => commands::restart_command(client, &name).await,

        Commands::Status { name } => commands::status_command(client, &name).await,

        Commands::List { running } => commands::list_command(client, running).await,

        Commands::Register(args) => commands::register_command(client, args.into()).await,

        Commands::Reload => commands::reload_command(client).await,

        Commands::Tunnel { action } => match action {
            TunnelAction::Start => commands::tunnel_start_command(client).await,
            TunnelAction::Stop => commands::tunnel_stop_command(client).await,
            TunnelAction::Status => commands::tunnel_status_command(client).await,
        },

        Commands::Serve { .. } | Commands::Config { .. } | Commands::Shutdown => Ok(()),
    }
}

/// `--flag` / `--no-flag` pair to an optional override
fn tri_state(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Client aimed at the IPC port from the config file
fn connect_client(config_path: Option<&PathBuf>) -> Result<WardenClient> {
    let config = load_config(config_path)?;
    Ok(WardenClient::with_address(config.ipc_address()))
}

fn load_config(config_path: Option<&PathBuf>) -> Result<DaemonConfig> {
    config::load_daemon_config(config_path.map(PathBuf::as_path)).with_context(|| {
        match config_path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load default config".to_string(),
        }
    })
}

/// Print a daemon error with a hint, then pass it on for the exit code
fn report(e: anyhow::Error) -> anyhow::Error {
    if let Some(daemon) = e.downcast_ref::<DaemonError>() {
        print_error(&daemon.message);
        match daemon.kind {
            ErrorKind::MissingRegistryEntry => {
                print_info("Add it with: mcwarden register <name> <path>");
            }
            ErrorKind::ForceKillFailed => {
                print_warning("The process may still be running; check it by hand");
            }
            _ => {}
        }
    }
    e
}

// ============================================================================
// Daemon
// ============================================================================

async fn run_serve(
    foreground: bool,
    port_override: Option<u16>,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    if !foreground {
        // Daemonize by re-spawning ourselves
        let exe = std::env::current_exe()?;
        let mut cmd = std::process::Command::new(exe);
        cmd.arg("serve").arg("--foreground");
        if let Some(port) = port_override {
            cmd.arg("--port").arg(port.to_string());
        }
        if let Some(path) = config_path {
            cmd.arg("--config").arg(path);
        }

        let child = cmd
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .context("Failed to launch daemon")?;

        print_success(&format!("Daemon started (PID: {})", child.id()));
        return Ok(());
    }

    tracing::info!("mcwarden daemon starting...");

    let mut config = load_config(config_path)?;
    if let Some(port) = port_override {
        config.ipc_port = port;
    }

    let cancel = CancellationToken::new();
    mw_orchestrator::daemon::spawn_signal_handler(cancel.clone());

    println!();
    println!("  \x1b[1;32mmcwarden daemon\x1b[0m");
    println!();
    println!("  IPC:      {}", config.ipc_address());
    println!("  Registry: {}", config.registry_path.display());
    println!();

    mw_orchestrator::daemon::run_daemon(config, pidfile::default_pid_path(), cancel).await
}
