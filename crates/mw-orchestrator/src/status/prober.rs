//! Server List Ping prober

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use mw_core::report::StatusSnapshot;
use mw_core::time::current_time_millis;
use mw_core::traits::StatusProbe;
use mw_core::ProbeError;
use mw_protocol::{PingCodec, PingPacket, StatusResponse};

/// Port assumed when an address has none
pub const DEFAULT_GAME_PORT: u16 = 25565;

type PingStream = Framed<TcpStream, PingCodec>;

/// Probes servers over TCP with the status handshake
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

impl TcpProber {
    /// Create a prober
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StatusProbe for TcpProber {
    async fn probe(&self, address: &str, limit: Duration) -> Result<StatusSnapshot, ProbeError> {
        let (host, port) = split_address(address);

        let stream = match timeout(limit, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::debug!(%address, "Server unreachable: {}", e);
                return Ok(StatusSnapshot::offline());
            }
            Err(_) => {
                tracing::debug!(%address, "Connect timed out");
                return Ok(StatusSnapshot::offline());
            }
        };

        let started = Instant::now();
        let mut framed = Framed::new(stream, PingCodec::client());
        let (status, status_rtt) = match timeout(limit, request_status(&mut framed, &host, port)).await {
            Ok(Err(ProbeError::Protocol(mw_protocol::ProtocolError::Io(e))))
                if is_disconnect(&e) =>
            {
                tracing::debug!(%address, "Connection dropped during handshake: {}", e);
                return Ok(StatusSnapshot::offline());
            }
            Ok(result) => result?,
            Err(_) => {
                // Accepting connections but not answering (still booting)
                tracing::debug!(%address, "Status handshake timed out");
                return Ok(StatusSnapshot::offline());
            }
        };

        // The status is already in hand; a missing pong only costs the latency figure
        let remaining = limit.saturating_sub(started.elapsed());
        let latency = match timeout(remaining, ping(&mut framed)).await {
            Ok(Some(rtt)) => rtt,
            Ok(None) => status_rtt,
            Err(_) => {
                tracing::debug!(%address, "No pong before the deadline");
                status_rtt
            }
        };

        Ok(snapshot(&status, latency))
    }
}

/// Handshake plus status request; returns the parsed status and its round trip
async fn request_status(
    framed: &mut PingStream,
    host: &str,
    port: u16,
) -> Result<(StatusResponse, Duration), ProbeError> {
    let started = Instant::now();
    framed.send(PingPacket::status_handshake(host, port)).await?;
    framed.send(PingPacket::StatusRequest).await?;

    let json = match framed.next().await {
        Some(Ok(PingPacket::StatusResponse(json))) => json,
        Some(Ok(other)) => return Err(ProbeError::UnexpectedPacket(format!("{:?}", other))),
        Some(Err(e)) => return Err(e.into()),
        None => return Err(ProbeError::ConnectionClosed),
    };
    let status_rtt = started.elapsed();
    Ok((StatusResponse::from_json(&json)?, status_rtt))
}

fn snapshot(status: &StatusResponse, latency: Duration) -> StatusSnapshot {
    let motd = status.motd();
    StatusSnapshot {
        online: true,
        version: Some(status.version.name.clone()).filter(|v| !v.is_empty()),
        protocol: Some(status.version.protocol),
        players_online: status.players.online,
        players_max: status.players.max,
        latency_ms: Some(latency.as_secs_f64() * 1000.0),
        motd: Some(motd).filter(|m| !m.is_empty()),
        sample: status.sample_names(),
    }
}

/// Ping/pong round trip; `None` if the server hangs up or echoes garbage
async fn ping(framed: &mut PingStream) -> Option<Duration> {
    let payload = current_time_millis() as i64;
    let started = Instant::now();
    framed.send(PingPacket::Ping(payload)).await.ok()?;
    match framed.next().await {
        Some(Ok(PingPacket::Pong(echo))) if echo == payload => Some(started.elapsed()),
        _ => None,
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Split `host:port`, defaulting the port to 25565
///
/// Bracketed IPv6 (`[::1]:25565`) is supported; a bare IPv6 literal is taken
/// as a host without port.
pub fn split_address(address: &str) -> (String, u16) {
    if let Some(rest) = address.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_GAME_PORT);
            return (host.to_string(), port);
        }
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (host.to_string(), DEFAULT_GAME_PORT),
        },
        _ => (address.to_string(), DEFAULT_GAME_PORT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const STATUS_JSON: &str = r#"{
        "version": {"name": "1.20.4", "protocol": 765},
        "players": {"max": 20, "online": 2, "sample": [
            {"name": "Steve", "id": "00000000-0000-0000-0000-000000000001"},
            {"name": "Alex", "id": "00000000-0000-0000-0000-000000000002"}
        ]},
        "description": {"text": "A Minecraft Server"}
    }"#;

    /// What the scripted server does once the status is sent
    #[derive(Clone, Copy)]
    enum AfterStatus {
        Pong,
        HangUp,
        /// Read the ping, never answer, keep the socket open
        Stall,
    }

    async fn spawn_server(body: &'static str, after: AfterStatus) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, PingCodec::server());

            match framed.next().await {
                Some(Ok(PingPacket::Handshake { next_state, .. })) => assert_eq!(next_state, 1),
                other => panic!("Expected handshake, got {:?}", other),
            }
            assert_eq!(framed.next().await.unwrap().unwrap(), PingPacket::StatusRequest);
            framed
                .send(PingPacket::StatusResponse(body.to_string()))
                .await
                .unwrap();

            match after {
                AfterStatus::Pong => {
                    if let Some(Ok(PingPacket::Ping(payload))) = framed.next().await {
                        framed.send(PingPacket::Pong(payload)).await.unwrap();
                    }
                }
                AfterStatus::HangUp => {}
                AfterStatus::Stall => {
                    let _ = framed.next().await;
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
            }
        });

        address
    }

    #[tokio::test]
    async fn test_probe_parses_status() {
        let address = spawn_server(STATUS_JSON, AfterStatus::Pong).await;

        let snapshot = TcpProber::new()
            .probe(&address, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(snapshot.online);
        assert_eq!(snapshot.version.as_deref(), Some("1.20.4"));
        assert_eq!(snapshot.protocol, Some(765));
        assert_eq!(snapshot.players_online, 2);
        assert_eq!(snapshot.players_max, 20);
        assert_eq!(snapshot.motd.as_deref(), Some("A Minecraft Server"));
        assert_eq!(
            snapshot.sample,
            Some(vec!["Steve".to_string(), "Alex".to_string()])
        );
        assert!(snapshot.latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_probe_without_pong_uses_status_rtt() {
        let address = spawn_server(STATUS_JSON, AfterStatus::HangUp).await;

        let snapshot = TcpProber::new()
            .probe(&address, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(snapshot.online);
        assert!(snapshot.latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_stalled_pong_keeps_status() {
        let address = spawn_server(STATUS_JSON, AfterStatus::Stall).await;

        let started = Instant::now();
        let snapshot = TcpProber::new()
            .probe(&address, Duration::from_millis(500))
            .await
            .unwrap();

        assert!(snapshot.online);
        assert_eq!(snapshot.players_online, 2);
        assert_eq!(snapshot.version.as_deref(), Some("1.20.4"));
        assert!(snapshot.latency_ms.is_some());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_is_offline_snapshot() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let snapshot = TcpProber::new()
            .probe(&format!("127.0.0.1:{}", port), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(snapshot, StatusSnapshot::offline());
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_error() {
        let address = spawn_server("{ nope", AfterStatus::HangUp).await;

        let result = TcpProber::new().probe(&address, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Protocol(_))));
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("localhost:25570"), ("localhost".to_string(), 25570));
        assert_eq!(split_address("play.example.net"), ("play.example.net".to_string(), 25565));
        assert_eq!(split_address("[::1]:25566"), ("::1".to_string(), 25566));
        assert_eq!(split_address("::1"), ("::1".to_string(), 25565));
    }
}
