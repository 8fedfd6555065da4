//! RCON client
//!
//! Each call opens a fresh session: connect, log in, send one command, read
//! its response, hang up. Servers only allow a handful of console sessions
//! and drop idle ones, so nothing is pooled.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use mw_core::traits::ConsoleClient;
use mw_core::{RconEndpoint, RconError};
use mw_protocol::{PacketKind, RconCodec, RconPacket};

type RconStream = Framed<TcpStream, RconCodec>;

/// RCON client with a per-step I/O timeout
#[derive(Debug, Clone)]
pub struct RconClient {
    io_timeout: Duration,
}

impl RconClient {
    /// Create a client; `io_timeout` bounds the connect and every read/write
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }

    async fn connect(&self, address: &str) -> Result<RconStream, RconError> {
        let stream = match timeout(self.io_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(RconError::ConnectFailed {
                    endpoint: address.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(RconError::ConnectFailed {
                    endpoint: address.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };
        stream.set_nodelay(true).ok();
        Ok(Framed::new(stream, RconCodec::new()))
    }

    async fn send(
        &self,
        framed: &mut RconStream,
        packet: RconPacket,
        address: &str,
    ) -> Result<(), RconError> {
        match timeout(self.io_timeout, framed.send(packet)).await {
            Ok(result) => result.map_err(RconError::from),
            Err(_) => Err(RconError::Timeout {
                endpoint: address.to_string(),
            }),
        }
    }

    async fn recv(&self, framed: &mut RconStream, address: &str) -> Result<RconPacket, RconError> {
        match timeout(self.io_timeout, framed.next()).await {
            Ok(Some(result)) => result.map_err(RconError::from),
            Ok(None) => Err(RconError::ConnectionClosed),
            Err(_) => Err(RconError::Timeout {
                endpoint: address.to_string(),
            }),
        }
    }

    async fn login(
        &self,
        framed: &mut RconStream,
        secret: &str,
        address: &str,
    ) -> Result<(), RconError> {
        let login_id = next_request_id();
        self.send(framed, RconPacket::login(login_id, secret), address)
            .await?;

        // Some servers send an empty response value ahead of the auth response
        loop {
            let packet = self.recv(framed, address).await?;
            if packet.is_auth_failure() {
                return Err(RconError::AuthenticationFailed);
            }
            if packet.kind == PacketKind::AUTH_RESPONSE && packet.request_id == login_id {
                return Ok(());
            }
            tracing::trace!(
                request_id = packet.request_id,
                kind = %packet.kind,
                "Skipping packet before auth response"
            );
        }
    }
}

#[async_trait]
impl ConsoleClient for RconClient {
    async fn execute(
        &self,
        endpoint: &RconEndpoint,
        secret: &str,
        command: &str,
    ) -> Result<String, RconError> {
        let address = endpoint.address();
        let mut framed = self.connect(&address).await?;
        self.login(&mut framed, secret, &address).await?;

        let command_id = next_request_id();
        self.send(&mut framed, RconPacket::command(command_id, command), &address)
            .await?;

        // Long replies arrive split over several packets with the command's id.
        // The answer to an empty marker command comes after the last of them.
        let marker_id = loop {
            let id = next_request_id();
            if id != command_id {
                break id;
            }
        };
        let marker_sent = self
            .send(&mut framed, RconPacket::command(marker_id, ""), &address)
            .await
            .is_ok();

        let mut body = String::new();
        let mut fragments = 0usize;
        loop {
            let packet = match self.recv(&mut framed, &address).await {
                Ok(packet) => packet,
                // Server hung up or ignored the marker after answering
                Err(e) if fragments > 0 => {
                    tracing::trace!(%address, "Reply ended without marker: {}", e);
                    break;
                }
                Err(e) => return Err(e),
            };

            if packet.request_id == command_id {
                body.push_str(&packet.body);
                fragments += 1;
                if !marker_sent {
                    break;
                }
            } else if packet.request_id == marker_id && fragments > 0 {
                break;
            }
        }

        tracing::debug!(%address, command, fragments, "RCON command answered");
        Ok(body)
    }
}

/// Positive id, so it can never collide with the auth-failure marker
fn next_request_id() -> i32 {
    rand::thread_rng().gen_range(1..i32::MAX)
}
