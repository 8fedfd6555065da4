//! IPC client for communicating with the daemon
//!
//! One TCP connection per client, reused for every request. Requests and
//! responses are single JSON lines.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use mw_core::error::ErrorKind;
use mw_core::ipc::{default_ipc_address, IpcRequest, IpcResponse};
use mw_core::report::{
    RestartReport, ServerSummary, StartReport, StatusReport, StopReport, TunnelEvent,
};
use mw_core::{ServerDescriptor, TunnelState};

/// Error reported by the daemon for a well-formed request
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DaemonError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Client for communicating with the mcwarden daemon
pub struct WardenClient {
    address: String,
    stream: Option<BufReader<TcpStream>>,
}

impl WardenClient {
    /// Create a new client with default address
    pub fn new() -> Self {
        Self::with_address(default_ipc_address())
    }

    /// Create a new client with custom address
    pub fn with_address(address: String) -> Self {
        Self {
            address,
            stream: None,
        }
    }

    /// Get the address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Connect to the daemon if not already connected
    pub async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        tracing::debug!("Connecting to daemon at {}", self.address);

        let stream = TcpStream::connect(&self.address).await.with_context(|| {
            format!(
                "Failed to connect to mcwarden daemon at {}. Is it running? Try: mcwarden serve",
                self.address
            )
        })?;

        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    /// Check if the daemon is running
    pub async fn ping(&mut self) -> Result<bool> {
        match self.send_request(IpcRequest::Ping).await {
            Ok(IpcResponse::Pong) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Start a server
    pub async fn start(&mut self, name: &str, ensure_tunnel: Option<bool>) -> Result<StartReport> {
        let request = IpcRequest::Start {
            name: name.to_string(),
            ensure_tunnel,
        };
        match self.send_request(request).await? {
            IpcResponse::Started(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// Stop a server
    pub async fn stop(&mut self, name: &str, stop_tunnel: Option<bool>) -> Result<StopReport> {
        let request = IpcRequest::Stop {
            name: name.to_string(),
            stop_tunnel,
        };
        match self.send_request(request).await? {
            IpcResponse::Stopped(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// Restart a server
    pub async fn restart(&mut self, name: &str) -> Result<RestartReport> {
        let request = IpcRequest::Restart {
            name: name.to_string(),
        };
        match self.send_request(request).await? {
            IpcResponse::Restarted(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// Query a server's status
    pub async fn status(&mut self, name: &str) -> Result<StatusReport> {
        let request = IpcRequest::Status {
            name: name.to_string(),
        };
        match self.send_request(request).await? {
            IpcResponse::Status(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// List registered and running servers
    pub async fn list_servers(&mut self) -> Result<Vec<ServerSummary>> {
        match self.send_request(IpcRequest::ListServers).await? {
            IpcResponse::Servers { servers } => Ok(servers),
            other => Err(unexpected(other)),
        }
    }

    /// Add or replace a registry entry; true if one was replaced
    pub async fn register(&mut self, descriptor: ServerDescriptor) -> Result<bool> {
        match self
            .send_request(IpcRequest::Register { descriptor })
            .await?
        {
            IpcResponse::Registered { replaced } => Ok(replaced),
            other => Err(unexpected(other)),
        }
    }

    /// Re-read the registry file, returning the entry count
    pub async fn reload_registry(&mut self) -> Result<usize> {
        match self.send_request(IpcRequest::ReloadRegistry).await? {
            IpcResponse::Reloaded { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Ensure the tunnel is running
    pub async fn tunnel_start(&mut self) -> Result<TunnelEvent> {
        match self.send_request(IpcRequest::TunnelStart).await? {
            IpcResponse::Tunnel(event) => Ok(event),
            other => Err(unexpected(other)),
        }
    }

    /// Stop the tunnel
    pub async fn tunnel_stop(&mut self) -> Result<TunnelEvent> {
        match self.send_request(IpcRequest::TunnelStop).await? {
            IpcResponse::Tunnel(event) => Ok(event),
            other => Err(unexpected(other)),
        }
    }

    /// Current tunnel state
    pub async fn tunnel_status(&mut self) -> Result<TunnelState> {
        match self.send_request(IpcRequest::TunnelStatus).await? {
            IpcResponse::TunnelState(state) => Ok(state),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        match self.send_request(IpcRequest::Shutdown).await? {
            IpcResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Send a request, turning an `error` response into a [`DaemonError`]
    async fn send_request(&mut self, request: IpcRequest) -> Result<IpcResponse> {
        match self.send_request_raw(request).await? {
            IpcResponse::Error { kind, message } => Err(DaemonError { kind, message }.into()),
            response => Ok(response),
        }
    }

    async fn send_request_raw(&mut self, request: IpcRequest) -> Result<IpcResponse> {
        self.connect().await?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;

        // Send request as JSON line
        let mut request_json = serde_json::to_string(&request)?;
        request_json.push('\n');
        stream.get_mut().write_all(request_json.as_bytes()).await?;

        // Read response line
        let mut response_line = String::new();
        if stream.read_line(&mut response_line).await? == 0 {
            self.stream = None;
            anyhow::bail!("Daemon closed the connection");
        }

        let response: IpcResponse = serde_json::from_str(&response_line)
            .context("Failed to parse daemon response")?;
        Ok(response)
    }
}

impl Default for WardenClient {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(response: IpcResponse) -> anyhow::Error {
    anyhow::anyhow!("Unexpected response: {:?}", response)
}
