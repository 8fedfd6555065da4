//! Server status: the ping handshake and the RCON player list

mod players;
mod prober;

pub use players::{parse_player_list, strip_formatting};
pub use prober::{split_address, TcpProber, DEFAULT_GAME_PORT};
