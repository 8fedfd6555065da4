//! mcwarden daemon
//!
//! Standalone daemon binary; `mcwarden serve` runs the same code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mw_core::{config, pidfile};
use mw_orchestrator::daemon::{run_daemon, spawn_signal_handler};

#[derive(Parser)]
#[command(name = "mw-orchestrator")]
#[command(about = "mcwarden daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IPC port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server registry file (overrides config)
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = config::load_daemon_config(args.config.as_deref())
        .with_context(|| match &args.config {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load default config".to_string(),
        })?;

    if let Some(port) = args.port {
        config.ipc_port = port;
    }
    if let Some(registry) = args.registry {
        config.registry_path = registry;
    }

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    run_daemon(config, pidfile::default_pid_path(), cancel).await
}
