//! Server List Ping (status handshake) packets
//!
//! Each packet is framed as `VarInt length | VarInt packet id | data`. The
//! exchange used here is:
//!
//! 1. client → Handshake (0x00, next state = 1)
//! 2. client → Status Request (0x00)
//! 3. server → Status Response (0x00, JSON string)
//! 4. client → Ping (0x01, i64)
//! 5. server → Pong (0x01, same i64)
//!
//! Packet ids are reused across directions and states, so the codec is
//! built for one side of the connection and tracks the handshake state.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::varint::{get_string, get_varint, peek_varint, put_string, put_varint};

/// Largest packet accepted (the 21-bit limit vanilla uses)
pub const MAX_PACKET_SIZE: usize = 2_097_151;

/// Protocol version sent in the handshake; -1 asks the server for its own
pub const PROBE_PROTOCOL_VERSION: i32 = -1;

/// Handshake next-state value requesting status
pub const NEXT_STATE_STATUS: i32 = 1;

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_ID: i32 = 0x00;
const PING_ID: i32 = 0x01;

/// A Server List Ping packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingPacket {
    /// Client handshake
    Handshake {
        protocol_version: i32,
        host: String,
        port: u16,
        next_state: i32,
    },
    /// Client status request
    StatusRequest,
    /// Server status response carrying JSON
    StatusResponse(String),
    /// Client ping
    Ping(i64),
    /// Server pong
    Pong(i64),
}

impl PingPacket {
    /// Build the handshake for a status query against `host:port`
    pub fn status_handshake(host: &str, port: u16) -> Self {
        Self::Handshake {
            protocol_version: PROBE_PROTOCOL_VERSION,
            host: host.to_string(),
            port,
            next_state: NEXT_STATE_STATUS,
        }
    }

    fn packet_id(&self) -> i32 {
        match self {
            PingPacket::Handshake { .. } => HANDSHAKE_ID,
            PingPacket::StatusRequest | PingPacket::StatusResponse(_) => STATUS_ID,
            PingPacket::Ping(_) | PingPacket::Pong(_) => PING_ID,
        }
    }
}

/// Which end of the connection a codec serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Decodes server packets (status response, pong)
    Client,
    /// Decodes client packets (handshake, status request, ping)
    Server,
}

/// Codec for Server List Ping packets
#[derive(Debug)]
pub struct PingCodec {
    side: Side,
    /// Server side only: whether the handshake has been received
    handshaken: bool,
}

impl PingCodec {
    /// Codec for the querying side
    pub fn client() -> Self {
        Self {
            side: Side::Client,
            handshaken: true,
        }
    }

    /// Codec for the answering side
    pub fn server() -> Self {
        Self {
            side: Side::Server,
            handshaken: false,
        }
    }

    fn decode_body(&mut self, id: i32, body: &mut BytesMut) -> Result<PingPacket, ProtocolError> {
        match (self.side, id) {
            (Side::Client, STATUS_ID) => Ok(PingPacket::StatusResponse(get_string(body)?)),
            (Side::Client, PING_ID) => Ok(PingPacket::Pong(read_i64(body)?)),
            (Side::Server, HANDSHAKE_ID) if !self.handshaken => {
                let protocol_version = get_varint(body)?;
                let host = get_string(body)?;
                if body.remaining() < 2 {
                    return Err(ProtocolError::Truncated {
                        expected: 2,
                        actual: body.remaining(),
                    });
                }
                let port = body.get_u16();
                let next_state = get_varint(body)?;
                self.handshaken = true;
                Ok(PingPacket::Handshake {
                    protocol_version,
                    host,
                    port,
                    next_state,
                })
            }
            (Side::Server, STATUS_ID) => Ok(PingPacket::StatusRequest),
            (Side::Server, PING_ID) => Ok(PingPacket::Ping(read_i64(body)?)),
            (Side::Client, other) => Err(ProtocolError::UnexpectedPacket {
                expected: STATUS_ID,
                actual: other,
            }),
            (Side::Server, other) => Err(ProtocolError::UnexpectedPacket {
                expected: HANDSHAKE_ID,
                actual: other,
            }),
        }
    }
}

fn read_i64(body: &mut BytesMut) -> Result<i64, ProtocolError> {
    if body.remaining() < 8 {
        return Err(ProtocolError::Truncated {
            expected: 8,
            actual: body.remaining(),
        });
    }
    Ok(body.get_i64())
}

impl Decoder for PingCodec {
    type Item = PingPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((length, prefix_len)) = peek_varint(src)? else {
            return Ok(None);
        };

        if length <= 0 {
            return Err(ProtocolError::InvalidLength(length as i64));
        }
        let length = length as usize;
        if length > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size: length,
                max: MAX_PACKET_SIZE,
            });
        }

        if src.len() < prefix_len + length {
            src.reserve(prefix_len + length - src.len());
            return Ok(None);
        }

        src.advance(prefix_len);
        let mut body = src.split_to(length);
        let id = get_varint(&mut body)?;
        self.decode_body(id, &mut body).map(Some)
    }
}

impl Encoder<PingPacket> for PingCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: PingPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        put_varint(&mut body, packet.packet_id());

        match packet {
            PingPacket::Handshake {
                protocol_version,
                host,
                port,
                next_state,
            } => {
                put_varint(&mut body, protocol_version);
                put_string(&mut body, &host);
                body.put_u16(port);
                put_varint(&mut body, next_state);
            }
            PingPacket::StatusRequest => {}
            PingPacket::StatusResponse(json) => put_string(&mut body, &json),
            PingPacket::Ping(payload) | PingPacket::Pong(payload) => body.put_i64(payload),
        }

        if body.len() > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size: body.len(),
                max: MAX_PACKET_SIZE,
            });
        }

        put_varint(dst, body.len() as i32);
        dst.extend_from_slice(&body);
        Ok(())
    }
}

/// JSON body of a status response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub version: StatusVersion,
    #[serde(default)]
    pub players: StatusPlayers,
    /// Either a plain string or a chat component
    #[serde(default)]
    pub description: serde_json::Value,
}

/// `version` object of a status response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protocol: i32,
}

/// `players` object of a status response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusPlayers {
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub online: u32,
    #[serde(default)]
    pub sample: Option<Vec<PlayerSample>>,
}

/// One entry of the player sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

impl StatusResponse {
    /// Parse the JSON carried by a status response packet
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Description flattened to plain text
    pub fn motd(&self) -> String {
        let mut out = String::new();
        flatten_component(&self.description, &mut out);
        out
    }

    /// Names from the player sample, if the server sent one
    pub fn sample_names(&self) -> Option<Vec<String>> {
        self.players
            .sample
            .as_ref()
            .map(|s| s.iter().map(|p| p.name.clone()).collect())
    }
}

fn flatten_component(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::String(s) => out.push_str(s),
        serde_json::Value::Object(map) => {
            if let Some(text) = map.get("text") {
                flatten_component(text, out);
            }
            if let Some(serde_json::Value::Array(extra)) = map.get("extra") {
                for part in extra {
                    flatten_component(part, out);
                }
            }
        }
        serde_json::Value::Array(parts) => {
            for part in parts {
                flatten_component(part, out);
            }
        }
        _ => {}
    }
}
