//! Wall-clock helpers for process start times and uptime

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in milliseconds.
///
/// # Panics
/// Panics if the system clock is set before 1970-01-01.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as u64
}

/// Time elapsed since a millisecond timestamp, zero if it lies in the future.
pub fn uptime_since(started_at_millis: u64) -> Duration {
    Duration::from_millis(current_time_millis().saturating_sub(started_at_millis))
}

/// Render a duration as a short human string (`42s`, `3m 5s`, `2h 10m`, `1d 4h`)
pub fn format_uptime(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_for_future_start_is_zero() {
        let future = current_time_millis() + 1_000_000;
        assert_eq!(uptime_since(future), Duration::ZERO);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(185)), "3m 5s");
        assert_eq!(format_uptime(Duration::from_secs(7800)), "2h 10m");
        assert_eq!(format_uptime(Duration::from_secs(100_800)), "1d 4h");
    }
}
