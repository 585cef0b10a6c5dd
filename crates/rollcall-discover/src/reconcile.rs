//! Reconciliation: map roster rows to presence statuses and detect
//! transitions against the last known state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rollcall_core::{
    status_log, Address, PresenceStatus, RosterEntry, StatusUpdate, VerdictSet,
    DUPLICATE_ENTRY_LABEL,
};
use rollcall_roster::schema::{FULL_NAME, IP_ADDRESS, STATUS, STATUS_LOG};
use rollcall_roster::{RosterRow, RosterSheet};
use serde::Serialize;

use crate::state::EngineState;

/// Convert store rows into roster entries.
///
/// Rows flagged as duplicates are left out, so a flag whose deletion
/// failed survives until a later cycle removes the row.
pub fn entries_from_sheet(sheet: &RosterSheet) -> Vec<RosterEntry> {
    sheet
        .rows
        .iter()
        .filter(|row| !is_flagged(row))
        .map(|row| RosterEntry {
            row: row.row,
            full_name: row.get(FULL_NAME).to_string(),
            address: Address::classify(row.get(IP_ADDRESS)),
            previous_status: PresenceStatus::from_label(row.get(STATUS)),
            status_log: row.get(STATUS_LOG).to_string(),
        })
        .collect()
}

/// Rows flagged as duplicates, highest row first, so deleting them in
/// order never shifts a row that is still waiting to be deleted.
pub fn stale_rows(sheet: &RosterSheet) -> Vec<usize> {
    let mut rows: Vec<usize> = sheet
        .rows
        .iter()
        .filter(|r| is_flagged(r))
        .map(|r| r.row)
        .collect();
    rows.sort_unstable_by(|a, b| b.cmp(a));
    rows
}

fn is_flagged(row: &RosterRow) -> bool {
    row.get(STATUS) == DUPLICATE_ENTRY_LABEL
}

/// Status for one recorded address.
pub fn classify(address: &Address, verdicts: &VerdictSet) -> PresenceStatus {
    match address {
        Address::Unsupported(_) => PresenceStatus::UnsupportedAddressFamily,
        Address::V4(_) if verdicts.contains(address) => PresenceStatus::Present,
        Address::V4(_) => PresenceStatus::Absent,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub rows: u32,
    pub present: u32,
    pub absent: u32,
    pub unsupported: u32,
    /// Rows with a blank address; left untouched.
    pub skipped: u32,
    pub transitions: u32,
}

/// Updates for one cycle plus the statuses to remember once written.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub updates: Vec<StatusUpdate>,
    pub summary: ReconcileSummary,
    observed: HashMap<String, PresenceStatus>,
}

/// Owns the last-known-status map and applies the per-row policy.
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: EngineState,
    separator: String,
}

impl Reconciler {
    pub fn new(separator: &str) -> Self {
        Self {
            state: EngineState::new(),
            separator: separator.to_string(),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Compute one update per row with a recorded address.
    ///
    /// The state is read as it stood at the start of the cycle, so every
    /// row sharing an address sees the same baseline.
    pub fn plan(
        &self,
        entries: &[RosterEntry],
        verdicts: &VerdictSet,
        now: DateTime<Utc>,
    ) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();

        for entry in entries {
            plan.summary.rows += 1;

            let Some(address) = &entry.address else {
                plan.summary.skipped += 1;
                continue;
            };

            let status = classify(address, verdicts);
            match status {
                PresenceStatus::Present => plan.summary.present += 1,
                PresenceStatus::Absent => plan.summary.absent += 1,
                PresenceStatus::UnsupportedAddressFamily => plan.summary.unsupported += 1,
            }

            let key = address.key();
            let previous = self.state.get(&key).or(entry.previous_status);
            let (log_entry, status_log) = if previous == Some(status) {
                (None, None)
            } else {
                plan.summary.transitions += 1;
                let log_entry = status_log::format_entry(now, status);
                let merged = status_log::append(&entry.status_log, &log_entry, &self.separator);
                (Some(log_entry), Some(merged))
            };

            tracing::debug!(
                row = entry.row,
                name = %entry.full_name,
                address = %address,
                status = %status,
                previous = ?previous,
                "Row reconciled"
            );

            plan.observed.insert(key, status);
            plan.updates.push(StatusUpdate {
                row: entry.row,
                address: address.clone(),
                status,
                log_entry,
                status_log,
            });
        }

        plan
    }

    /// Remember the plan's statuses, except for addresses whose log entry
    /// could not be written. Those rows keep their old status cell, so the
    /// transition is detected again next cycle.
    pub fn commit(&mut self, plan: &ReconcilePlan, unlogged_rows: &HashSet<usize>) {
        let failed: HashSet<String> = plan
            .updates
            .iter()
            .filter(|u| unlogged_rows.contains(&u.row))
            .map(|u| u.address.key())
            .collect();

        for (key, status) in &plan.observed {
            if !failed.contains(key) {
                self.state.record(key, *status);
            }
        }
    }
}
