//! rollcall-core: Shared types for the rollcall presence engine.
//!
//! This crate provides the vocabulary used by every other rollcall crate:
//! - Roster addresses, classified as IPv4 or unsupported
//! - Presence statuses and their roster cell labels
//! - Probe results and the per-cycle verdict set
//! - Roster entries, status updates and status-log formatting

pub mod status_log;
pub mod types;

pub use types::{
    Address, PresenceStatus, ProbeResult, RosterEntry, StatusUpdate, VerdictSet,
    DUPLICATE_ENTRY_LABEL,
};
