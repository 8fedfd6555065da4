//! RCON packet encoding/decoding
//!
//! Every packet is little-endian:
//! - length: 4 bytes (i32, counts everything after itself)
//! - request_id: 4 bytes (i32)
//! - kind: 4 bytes (i32)
//! - body: ASCII/UTF-8 text
//! - terminator: 2 NUL bytes

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Smallest legal value of the length field (id + kind + two NULs)
pub const MIN_PACKET_LENGTH: usize = 10;

/// Largest length field accepted from a server (4096-byte body)
pub const MAX_PACKET_LENGTH: usize = 4096 + MIN_PACKET_LENGTH;

/// Longest command body a vanilla server accepts from a client
pub const MAX_COMMAND_LENGTH: usize = 1446;

/// Request id the server echoes back when authentication fails
pub const AUTH_FAILED_ID: i32 = -1;

/// RCON packet type
///
/// The protocol reuses the value 2 for both an outgoing command and an
/// incoming auth response, so this is a newtype rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketKind(pub i32);

impl PacketKind {
    /// Client login request carrying the password
    pub const LOGIN: Self = Self(3);
    /// Client command request
    pub const COMMAND: Self = Self(2);
    /// Server reply to a login request
    pub const AUTH_RESPONSE: Self = Self(2);
    /// Server reply to a command
    pub const RESPONSE_VALUE: Self = Self(0);

    /// Raw wire value
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconPacket {
    /// Client-chosen id, echoed by the server
    pub request_id: i32,
    /// Packet type
    pub kind: PacketKind,
    /// Text payload
    pub body: String,
}

impl RconPacket {
    /// Build a login packet
    pub fn login(request_id: i32, password: &str) -> Self {
        Self {
            request_id,
            kind: PacketKind::LOGIN,
            body: password.to_string(),
        }
    }

    /// Build a command packet
    pub fn command(request_id: i32, command: &str) -> Self {
        Self {
            request_id,
            kind: PacketKind::COMMAND,
            body: command.to_string(),
        }
    }

    /// Build a response packet (what a server sends back)
    pub fn response(request_id: i32, body: impl Into<String>) -> Self {
        Self {
            request_id,
            kind: PacketKind::RESPONSE_VALUE,
            body: body.into(),
        }
    }

    /// True if this is an auth response rejecting the password
    pub fn is_auth_failure(&self) -> bool {
        self.request_id == AUTH_FAILED_ID
    }
}

/// Codec for length-prefixed RCON packets
#[derive(Debug, Default)]
pub struct RconCodec;

impl RconCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RconCodec {
    type Item = RconPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        // Peek at the length without consuming it
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let declared = i32::from_le_bytes(prefix);

        if declared < MIN_PACKET_LENGTH as i32 {
            return Err(ProtocolError::InvalidLength(declared as i64));
        }
        let length = declared as usize;
        if length > MAX_PACKET_LENGTH {
            return Err(ProtocolError::PacketTooLarge {
                size: length,
                max: MAX_PACKET_LENGTH,
            });
        }

        if src.len() < LENGTH_PREFIX_SIZE + length {
            src.reserve(LENGTH_PREFIX_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let request_id = src.get_i32_le();
        let kind = PacketKind(src.get_i32_le());
        let body_bytes = src.split_to(length - MIN_PACKET_LENGTH);
        let terminator = [src.get_u8(), src.get_u8()];
        if terminator != [0, 0] {
            return Err(ProtocolError::MissingTerminator);
        }

        // Servers send legacy colour codes; never fail a packet over them
        let body = String::from_utf8_lossy(&body_bytes).into_owned();

        Ok(Some(RconPacket {
            request_id,
            kind,
            body,
        }))
    }
}

impl Encoder<RconPacket> for RconCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: RconPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = packet.body.as_bytes();
        if body.len() > MAX_COMMAND_LENGTH {
            return Err(ProtocolError::CommandTooLong {
                len: body.len(),
                max: MAX_COMMAND_LENGTH,
            });
        }

        let length = MIN_PACKET_LENGTH + body.len();
        dst.reserve(LENGTH_PREFIX_SIZE + length);
        dst.put_i32_le(length as i32);
        dst.put_i32_le(packet.request_id);
        dst.put_i32_le(packet.kind.as_i32());
        dst.extend_from_slice(body);
        dst.put_u8(0);
        dst.put_u8(0);

        Ok(())
    }
}
