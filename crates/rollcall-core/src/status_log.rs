//! Status-log text handling.
//!
//! The roster keeps an append-only log of status transitions in a single
//! text cell. Entries are `"<UTC timestamp> <label>"`, joined by a separator.

use chrono::{DateTime, Utc};

use crate::types::PresenceStatus;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one log entry for a transition into `status`.
pub fn format_entry(at: DateTime<Utc>, status: PresenceStatus) -> String {
    format!("{} {}", at.format(TIMESTAMP_FORMAT), status.label())
}

/// Append `entry` to an existing log.
pub fn append(existing: &str, entry: &str, separator: &str) -> String {
    let existing = existing.trim();
    if existing.is_empty() {
        entry.to_string()
    } else {
        format!("{existing}{separator}{entry}")
    }
}

/// Number of entries in a log.
pub fn entry_count(log: &str, separator: &str) -> usize {
    let log = log.trim();
    if log.is_empty() {
        0
    } else {
        log.split(separator).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_entry() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(
            format_entry(at, PresenceStatus::Present),
            "2024-03-01 09:05:00 Present"
        );
    }

    #[test]
    fn test_append_to_empty_log() {
        assert_eq!(append("", "a", " | "), "a");
        assert_eq!(append("  ", "a", " | "), "a");
    }

    #[test]
    fn test_append_to_existing_log() {
        let log = append("a", "b", " | ");
        assert_eq!(log, "a | b");
        assert_eq!(entry_count(&log, " | "), 2);
        assert_eq!(entry_count("", " | "), 0);
    }
}
