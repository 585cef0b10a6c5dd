//! Core domain types for the rollcall presence engine.
//!
//! These types carry a roster row from the store, through presence
//! detection, to the status update that is written back.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Status cell value marking a row for removal during stale-row cleanup.
pub const DUPLICATE_ENTRY_LABEL: &str = "Duplicate Entry";

// ── Address ───────────────────────────────────────────────────────

/// A recorded roster address.
///
/// Either a well-formed dotted-quad IPv4 address or a string that is not
/// one. Nothing in between is carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "value", rename_all = "snake_case")]
pub enum Address {
    V4(Ipv4Addr),
    Unsupported(String),
}

impl Address {
    /// Classify a raw address cell. Returns `None` when the cell is blank.
    pub fn classify(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<Ipv4Addr>() {
            Ok(ip) => Self::V4(ip),
            Err(_) => Self::Unsupported(trimmed.to_string()),
        })
    }

    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Self::V4(ip) => Some(*ip),
            Self::Unsupported(_) => None,
        }
    }

    /// Canonical text used to key change detection.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(ip) => write!(f, "{ip}"),
            Self::Unsupported(raw) => f.write_str(raw),
        }
    }
}

// ── Status ────────────────────────────────────────────────────────

/// Presence verdict for one roster row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceStatus {
    Present,
    Absent,
    UnsupportedAddressFamily,
}

impl PresenceStatus {
    /// The text written into the roster's status cell.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Invalid Wi-Fi",
            Self::UnsupportedAddressFamily => "Unsupported Address",
        }
    }

    /// Parse a status cell back into a status. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [Self::Present, Self::Absent, Self::UnsupportedAddressFamily]
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Probing ───────────────────────────────────────────────────────

/// Outcome of one liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub address: Ipv4Addr,
    pub reachable: bool,
}

/// Addresses confirmed present in the current cycle.
///
/// Built once per cycle and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerdictSet {
    addresses: HashSet<Ipv4Addr>,
}

impl VerdictSet {
    pub fn contains(&self, address: &Address) -> bool {
        address
            .ipv4()
            .is_some_and(|ip| self.addresses.contains(&ip))
    }

    pub fn contains_ip(&self, ip: &Ipv4Addr) -> bool {
        self.addresses.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromIterator<Ipv4Addr> for VerdictSet {
    fn from_iter<I: IntoIterator<Item = Ipv4Addr>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

// ── Roster ────────────────────────────────────────────────────────

/// A roster row as seen by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// 1-based store row; the header is row 1.
    pub row: usize,
    pub full_name: String,
    /// `None` when the address cell is blank.
    pub address: Option<Address>,
    /// Status already in the store, when it is one the engine writes.
    pub previous_status: Option<PresenceStatus>,
    pub status_log: String,
}

/// Write intent for one roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub row: usize,
    pub address: Address,
    pub status: PresenceStatus,
    /// Entry appended this cycle, present only on a status transition.
    pub log_entry: Option<String>,
    /// Full status-log text to write back when `log_entry` is set.
    pub status_log: Option<String>,
}

impl StatusUpdate {
    pub fn is_transition(&self) -> bool {
        self.log_entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ipv4() {
        assert_eq!(
            Address::classify(" 192.168.1.50 "),
            Some(Address::V4(Ipv4Addr::new(192, 168, 1, 50)))
        );
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(
            Address::classify("2001:db8::1"),
            Some(Address::Unsupported("2001:db8::1".to_string()))
        );
        assert_eq!(
            Address::classify("192.168.1"),
            Some(Address::Unsupported("192.168.1".to_string()))
        );
        assert_eq!(
            Address::classify("192.168.1.300"),
            Some(Address::Unsupported("192.168.1.300".to_string()))
        );
    }

    #[test]
    fn test_classify_blank() {
        assert_eq!(Address::classify(""), None);
        assert_eq!(Address::classify("   "), None);
    }

    #[test]
    fn test_status_labels_parse_back() {
        for status in [
            PresenceStatus::Present,
            PresenceStatus::Absent,
            PresenceStatus::UnsupportedAddressFamily,
        ] {
            assert_eq!(PresenceStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(
            PresenceStatus::from_label("  present "),
            Some(PresenceStatus::Present)
        );
        assert_eq!(PresenceStatus::from_label(DUPLICATE_ENTRY_LABEL), None);
        assert_eq!(PresenceStatus::from_label(""), None);
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&PresenceStatus::UnsupportedAddressFamily).unwrap();
        assert_eq!(json, "\"unsupported-address-family\"");
    }

    #[test]
    fn test_verdict_set_ignores_unsupported() {
        let set: VerdictSet = [Ipv4Addr::new(10, 0, 0, 5)].into_iter().collect();
        assert!(set.contains(&Address::V4(Ipv4Addr::new(10, 0, 0, 5))));
        assert!(!set.contains(&Address::Unsupported("10.0.0.5/24".to_string())));
        assert_eq!(set.len(), 1);
    }
}
