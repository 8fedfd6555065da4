//! Results of lifecycle operations
//!
//! These are plain values produced by the orchestrator and carried to the
//! CLI over IPC, so everything here is serializable.

use serde::{Deserialize, Serialize};

use crate::types::{ServerName, ServerState};

/// Point-in-time result of a status handshake
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub online: bool,
    pub version: Option<String>,
    pub protocol: Option<i32>,
    pub players_online: u32,
    pub players_max: u32,
    /// Round-trip time of the handshake, in milliseconds
    pub latency_ms: Option<f64>,
    pub motd: Option<String>,
    /// Player names the server chose to include in its status response
    pub sample: Option<Vec<String>>,
}

impl StatusSnapshot {
    /// Snapshot for a server that did not answer
    pub fn offline() -> Self {
        Self::default()
    }
}

/// What is known about the connected players beyond the count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerListing {
    /// Nobody online, or no RCON secret to ask with
    NotQueried,
    /// Names reported by RCON `list`
    Names { names: Vec<String> },
    /// RCON answered but without names
    Present,
    /// RCON failed; the count from the handshake still stands
    Unavailable { reason: String },
}

impl PlayerListing {
    /// One-line description for display, given the online count
    pub fn describe(&self, online: u32) -> String {
        match self {
            PlayerListing::NotQueried if online == 0 => "No players online".to_string(),
            PlayerListing::NotQueried | PlayerListing::Present => {
                format!("{} player(s) present", online)
            }
            PlayerListing::Names { names } => names.join(", "),
            PlayerListing::Unavailable { reason } => {
                format!("{} player(s) present (list unavailable: {})", online, reason)
            }
        }
    }
}

/// Answer to a status request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub name: ServerName,
    pub address: String,
    pub snapshot: StatusSnapshot,
    pub players: PlayerListing,
}

/// Something that happened to the tunnel as part of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TunnelEvent {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
    Stopped { pid: u32 },
    NotRunning,
    /// Tunnel action failed; the server operation went ahead anyway
    Failed { reason: String },
}

/// Answer to a start request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartReport {
    pub name: ServerName,
    pub pid: u32,
    pub started_at_ms: u64,
    pub tunnel: Option<TunnelEvent>,
}

/// Why the graceful stop path was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GracefulFailure {
    /// No RCON secret configured for the server
    NoSecret,
    /// Entry removed from the registry while running; endpoint unknown
    Unregistered,
    /// The stop command could not be delivered
    Rcon { message: String },
    /// Stop was delivered but the process outlived the timeout
    TimedOut { after_secs: u64 },
}

/// How a stop was achieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopMode {
    Graceful,
    Forced { reason: GracefulFailure },
}

/// Answer to a stop request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopReport {
    pub name: ServerName,
    pub pid: u32,
    pub mode: StopMode,
    pub tunnel: Option<TunnelEvent>,
}

impl StopReport {
    /// True if RCON shutdown was confirmed
    pub fn was_graceful(&self) -> bool {
        matches!(self.mode, StopMode::Graceful)
    }
}

/// Answer to a restart request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartReport {
    pub stop: StopReport,
    pub start: StartReport,
    pub cooldown_secs: u64,
}

/// One row of the server list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub name: ServerName,
    pub state: ServerState,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub address: Option<String>,
    /// False for a process still tracked after its entry was removed
    pub registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_listing() {
        assert_eq!(PlayerListing::NotQueried.describe(0), "No players online");
        assert_eq!(PlayerListing::Present.describe(3), "3 player(s) present");
        assert_eq!(
            PlayerListing::Names {
                names: vec!["Steve".into(), "Alex".into()]
            }
            .describe(2),
            "Steve, Alex"
        );
    }

    #[test]
    fn test_unavailable_listing_keeps_count() {
        let text = PlayerListing::Unavailable {
            reason: "RCON authentication failed".to_string(),
        }
        .describe(4);
        assert!(text.contains('4'));
        assert!(text.contains("authentication"));
    }

    #[test]
    fn test_stop_mode_serialization() {
        let mode = StopMode::Forced {
            reason: GracefulFailure::TimedOut { after_secs: 30 },
        };
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(
            json,
            r#"{"mode":"forced","reason":{"kind":"timed_out","after_secs":30}}"#
        );
        let back: StopMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }
}
