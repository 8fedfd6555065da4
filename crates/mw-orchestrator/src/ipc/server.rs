//! IPC server implementation
//!
//! Listens on localhost TCP for requests from the CLI. Every client gets its
//! own task, so a slow stop on one server never blocks a status query on
//! another.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use mw_core::ipc::{IpcRequest, IpcResponse};
use mw_core::{LifecycleError, ServerName};

use crate::lifecycle::{StartOptions, StopOptions};
use crate::state::DaemonState;

/// IPC server for CLI communication
///
/// Listens on localhost (127.0.0.1) only - not accessible from network.
pub struct IpcServer {
    /// Address to bind (127.0.0.1:port)
    pub address: String,
    state: Arc<DaemonState>,
    shutdown_token: Option<CancellationToken>,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(address: String, state: Arc<DaemonState>) -> Self {
        Self {
            address,
            state,
            shutdown_token: None,
        }
    }

    /// Set the shutdown token (call before run)
    ///
    /// `run` returns once it is cancelled, and the `shutdown` request cancels it.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = Some(token);
        self
    }

    /// Accept clients until shut down
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("Failed to bind IPC server to {}", self.address))?;

        tracing::info!("IPC server listening on {}", self.address);

        let token = self.shutdown_token.clone().unwrap_or_default();
        loop {
            let accepted = tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    if !peer_addr.ip().is_loopback() {
                        tracing::warn!("Rejected non-localhost connection from {}", peer_addr);
                        continue;
                    }

                    let state = Arc::clone(&self.state);
                    let shutdown_token = self.shutdown_token.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, state, shutdown_token).await {
                            tracing::warn!("IPC client error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept IPC connection: {}", e);
                }
            }
        }

        tracing::info!("IPC server stopped");
        Ok(())
    }
}

async fn handle_client(
    stream: TcpStream,
    state: Arc<DaemonState>,
    shutdown_token: Option<CancellationToken>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<IpcRequest>(trimmed) {
            Ok(request) => handle_request(request, &state, shutdown_token.as_ref()).await,
            Err(e) => IpcResponse::other_error(format!("Invalid request: {}", e)),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
    }

    Ok(())
}

async fn handle_request(
    request: IpcRequest,
    state: &DaemonState,
    shutdown_token: Option<&CancellationToken>,
) -> IpcResponse {
    let orchestrator = &state.orchestrator;

    match request {
        IpcRequest::Start {
            name,
            ensure_tunnel,
        } => {
            let name = match server_name(name) {
                Ok(name) => name,
                Err(response) => return response,
            };
            orchestrator
                .start(&name, StartOptions { ensure_tunnel })
                .await
                .map_or_else(error_response, IpcResponse::Started)
        }

        IpcRequest::Stop { name, stop_tunnel } => {
            let name = match server_name(name) {
                Ok(name) => name,
                Err(response) => return response,
            };
            orchestrator
                .stop(&name, StopOptions { stop_tunnel })
                .await
                .map_or_else(error_response, IpcResponse::Stopped)
        }

        IpcRequest::Restart { name } => {
            let name = match server_name(name) {
                Ok(name) => name,
                Err(response) => return response,
            };
            orchestrator
                .restart(&name)
                .await
                .map_or_else(error_response, IpcResponse::Restarted)
        }

        IpcRequest::Status { name } => {
            let name = match server_name(name) {
                Ok(name) => name,
                Err(response) => return response,
            };
            orchestrator
                .status(&name)
                .await
                .map_or_else(error_response, IpcResponse::Status)
        }

        IpcRequest::ListServers => IpcResponse::Servers {
            servers: orchestrator.list().await,
        },

        IpcRequest::Register { descriptor } => {
            if descriptor.name.as_str().trim().is_empty() {
                return IpcResponse::other_error("Server name must not be empty");
            }
            if descriptor.path.as_os_str().is_empty() {
                return IpcResponse::other_error("Server path must not be empty");
            }
            orchestrator
                .register(descriptor)
                .await
                .map_or_else(error_response, |replaced| IpcResponse::Registered { replaced })
        }

        IpcRequest::ReloadRegistry => orchestrator
            .reload_registry()
            .await
            .map_or_else(error_response, |count| IpcResponse::Reloaded { count }),

        IpcRequest::TunnelStart => match orchestrator.tunnel_start().await {
            Ok(event) => IpcResponse::Tunnel(event),
            Err(e) => IpcResponse::other_error(e.to_string()),
        },

        IpcRequest::TunnelStop => match orchestrator.tunnel_stop().await {
            Ok(event) => IpcResponse::Tunnel(event),
            Err(e) => IpcResponse::other_error(e.to_string()),
        },

        IpcRequest::TunnelStatus => IpcResponse::TunnelState(orchestrator.tunnel_state()),

        IpcRequest::Ping => IpcResponse::Pong,

        IpcRequest::Shutdown => {
            tracing::info!("Shutdown requested via IPC");
            if let Some(token) = shutdown_token {
                token.cancel();
                IpcResponse::Ok
            } else {
                IpcResponse::other_error("Shutdown not supported (no shutdown token configured)")
            }
        }
    }
}

fn server_name(name: String) -> Result<ServerName, IpcResponse> {
    if name.trim().is_empty() {
        return Err(IpcResponse::other_error("Server name must not be empty"));
    }
    Ok(ServerName::new(name))
}

fn error_response(e: LifecycleError) -> IpcResponse {
    IpcResponse::Error {
        kind: e.kind(),
        message: e.to_string(),
    }
}
