//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding packets
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Declared packet length is outside the allowed range
    #[error("Invalid packet length: {0}")]
    InvalidLength(i64),

    /// Packet exceeds maximum size
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    /// RCON command body exceeds what the server accepts
    #[error("Command too long: {len} bytes exceeds maximum of {max} bytes")]
    CommandTooLong { len: usize, max: usize },

    /// VarInt ran past five bytes
    #[error("VarInt is too long")]
    VarIntTooLong,

    /// Packet ended before all declared fields were read
    #[error("Truncated packet: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Packet id not valid for the current exchange
    #[error("Unexpected packet id {actual:#04x} (expected {expected:#04x})")]
    UnexpectedPacket { expected: i32, actual: i32 },

    /// Body was not terminated by the two NUL bytes RCON requires
    #[error("Missing RCON packet terminator")]
    MissingTerminator,

    /// String payload was not UTF-8
    #[error("Invalid UTF-8 in packet: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Status JSON could not be parsed
    #[error("Invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
