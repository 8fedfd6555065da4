//! Output formatting utilities for the CLI
//!
//! Tables for the server list, multi-line status blocks, one-line summaries
//! of lifecycle reports, and coloured status messages.

use std::time::Duration;

use tabled::{settings::Style, Table, Tabled};

use mw_core::report::{
    GracefulFailure, RestartReport, ServerSummary, StartReport, StatusReport, StopMode,
    StopReport, TunnelEvent,
};
use mw_core::time::format_uptime;

/// Format the server list as an ASCII table
///
/// Returns "No servers registered" for an empty list.
pub fn format_servers(servers: &[ServerSummary]) -> String {
    if servers.is_empty() {
        return "No servers registered".to_string();
    }

    #[derive(Tabled)]
    struct ServerRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "STATE")]
        state: String,
        #[tabled(rename = "PID")]
        pid: String,
        #[tabled(rename = "UPTIME")]
        uptime: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
    }

    let rows: Vec<ServerRow> = servers
        .iter()
        .map(|s| ServerRow {
            name: if s.registered {
                truncate(s.name.as_str(), 24)
            } else {
                format!("{} (unregistered)", truncate(s.name.as_str(), 24))
            },
            state: s.state.to_string(),
            pid: s
                .pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            uptime: s
                .uptime_secs
                .map(|secs| format_uptime(Duration::from_secs(secs)))
                .unwrap_or_else(|| "-".to_string()),
            address: s.address.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format a status report as a human-readable block
pub fn format_status(report: &StatusReport) -> String {
    let snapshot = &report.snapshot;
    let mut output = String::new();

    output.push_str(&format!(
        "{} ({}): {}\n",
        report.name,
        report.address,
        if snapshot.online { "online" } else { "offline" }
    ));

    if !snapshot.online {
        return output;
    }

    if let Some(version) = &snapshot.version {
        output.push_str(&format!("Version: {}\n", version));
    }
    if let Some(motd) = &snapshot.motd {
        if !motd.trim().is_empty() {
            output.push_str(&format!("MOTD: {}\n", motd.trim()));
        }
    }
    output.push_str(&format!(
        "Players: {}/{}\n",
        snapshot.players_online, snapshot.players_max
    ));
    if let Some(latency) = snapshot.latency_ms {
        output.push_str(&format!("Latency: {:.1} ms\n", latency));
    }
    output.push_str(&format!(
        "Online: {}\n",
        report.players.describe(snapshot.players_online)
    ));

    output
}

/// One line describing a start
pub fn describe_start(report: &StartReport) -> String {
    format!("Started {} (PID {})", report.name, report.pid)
}

/// One line describing a stop
pub fn describe_stop(report: &StopReport) -> String {
    match &report.mode {
        StopMode::Graceful => format!("Stopped {} gracefully (PID {})", report.name, report.pid),
        StopMode::Forced { reason } => format!(
            "Force-stopped {} (PID {}): {}",
            report.name,
            report.pid,
            describe_graceful_failure(reason)
        ),
    }
}

/// One line describing a restart
pub fn describe_restart(report: &RestartReport) -> String {
    format!(
        "Restarted {} (PID {} -> {}, {}s cooldown)",
        report.start.name, report.stop.pid, report.start.pid, report.cooldown_secs
    )
}

/// Why a stop had to fall back to a forced kill
pub fn describe_graceful_failure(reason: &GracefulFailure) -> String {
    match reason {
        GracefulFailure::NoSecret => "no RCON secret configured".to_string(),
        GracefulFailure::Unregistered => "server is no longer registered".to_string(),
        GracefulFailure::Rcon { message } => format!("RCON stop failed: {}", message),
        GracefulFailure::TimedOut { after_secs } => {
            format!("still running {}s after RCON stop", after_secs)
        }
    }
}

/// One line describing what happened to the tunnel
pub fn describe_tunnel(event: &TunnelEvent) -> String {
    match event {
        TunnelEvent::Started { pid } => format!("Tunnel started (PID {})", pid),
        TunnelEvent::AlreadyRunning { pid } => format!("Tunnel already running (PID {})", pid),
        TunnelEvent::Stopped { pid } => format!("Tunnel stopped (PID {})", pid),
        TunnelEvent::NotRunning => "Tunnel was not running".to_string(),
        TunnelEvent::Failed { reason } => format!("Tunnel failed: {}", reason),
    }
}

/// Print a tunnel event with the colour that fits it
pub fn print_tunnel_event(event: &TunnelEvent) {
    match event {
        TunnelEvent::Failed { .. } => print_warning(&describe_tunnel(event)),
        _ => print_info(&describe_tunnel(event)),
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Goes to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
