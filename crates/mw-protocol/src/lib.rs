//! mw-protocol: Wire codecs for talking to Minecraft servers
//!
//! Two protocols are covered: the RCON remote console (used to request a
//! graceful shutdown and to list players) and the Server List Ping status
//! handshake (used to check liveness, version, player counts and latency).

pub mod error;
pub mod ping;
pub mod rcon;
pub mod varint;

pub use error::ProtocolError;
pub use ping::{PingCodec, PingPacket, StatusResponse};
pub use rcon::{PacketKind, RconCodec, RconPacket, MAX_COMMAND_LENGTH};
