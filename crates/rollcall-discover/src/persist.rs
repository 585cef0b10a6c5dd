//! Roster write-out: stale-row cleanup and batched status writes.
//!
//! Cells are written as few contiguous column ranges as possible. A range
//! the store rejects is retried one cell at a time; a cell that still fails
//! is logged and reported so the caller can retry next cycle.
//!
//! Log cells go first. A row whose log write failed keeps its old status,
//! so the next cycle still sees the transition and writes the entry then.

use std::collections::HashSet;

use rollcall_core::StatusUpdate;
use rollcall_roster::schema::{STATUS, STATUS_LOG};
use rollcall_roster::RosterStore;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    /// Range or single-cell writes issued on the first attempt.
    pub batches: u32,
    /// Ranges that were rejected and retried cell by cell.
    pub fallbacks: u32,
    pub cells_written: u32,
    /// Rows whose status cell was not written.
    #[serde(skip)]
    pub failed_status: HashSet<usize>,
    /// Rows whose log text was not written.
    #[serde(skip)]
    pub failed_log: HashSet<usize>,
}

impl WriteReport {
    /// Rows with any cell left unwritten.
    pub fn failures(&self) -> u32 {
        self.failed_status.union(&self.failed_log).count() as u32
    }
}

/// Delete `rows` in the given order (callers pass highest first).
///
/// A row that cannot be deleted is logged and skipped. Returns how many
/// rows were removed.
pub async fn delete_stale_rows(store: &dyn RosterStore, rows: &[usize]) -> u32 {
    let mut deleted = 0;
    for &row in rows {
        match store.delete_row(row).await {
            Ok(()) => deleted += 1,
            Err(e) => tracing::warn!(row, error = %e, "Failed to delete duplicate row"),
        }
    }

    if !rows.is_empty() {
        tracing::info!(flagged = rows.len(), deleted, "Duplicate rows cleaned up");
    }
    deleted
}

/// Group `(row, value)` cells into runs of consecutive rows.
pub fn contiguous_runs(mut cells: Vec<(usize, String)>) -> Vec<(usize, Vec<String>)> {
    cells.sort_by_key(|(row, _)| *row);

    let mut runs: Vec<(usize, Vec<String>)> = Vec::new();
    for (row, value) in cells {
        match runs.last_mut() {
            Some((first, values)) if *first + values.len() == row => values.push(value),
            _ => runs.push((row, vec![value])),
        }
    }
    runs
}

/// Write each update's log text when the roster has a log column, then
/// its status. A row whose log write failed gets no status write.
pub async fn apply_updates(
    store: &dyn RosterStore,
    updates: &[StatusUpdate],
    has_log_column: bool,
) -> WriteReport {
    let mut report = WriteReport::default();

    if has_log_column {
        let logs = updates
            .iter()
            .filter_map(|u| u.status_log.clone().map(|log| (u.row, log)))
            .collect();
        let failed = write_column(store, STATUS_LOG, logs, &mut report).await;
        report.failed_log = failed;
    }

    let statuses = updates
        .iter()
        .filter(|u| !report.failed_log.contains(&u.row))
        .map(|u| (u.row, u.status.label().to_string()))
        .collect();
    let failed = write_column(store, STATUS, statuses, &mut report).await;
    report.failed_status = failed;

    tracing::info!(
        batches = report.batches,
        fallbacks = report.fallbacks,
        cells = report.cells_written,
        failed_rows = report.failures(),
        "Roster updates written"
    );
    report
}

/// Returns the rows whose cell could not be written.
async fn write_column(
    store: &dyn RosterStore,
    column: &str,
    cells: Vec<(usize, String)>,
    report: &mut WriteReport,
) -> HashSet<usize> {
    let mut failed = HashSet::new();
    for (first_row, values) in contiguous_runs(cells) {
        report.batches += 1;

        let result = if values.len() == 1 {
            store.write_cell(first_row, column, &values[0]).await
        } else {
            store.write_range(first_row, column, &values).await
        };

        match result {
            Ok(()) => report.cells_written += values.len() as u32,
            Err(e) if values.len() > 1 => {
                tracing::warn!(
                    column,
                    first_row,
                    rows = values.len(),
                    error = %e,
                    "Range write rejected, retrying row by row"
                );
                report.fallbacks += 1;
                write_cells(store, column, first_row, &values, report, &mut failed).await;
            }
            Err(e) => {
                tracing::warn!(column, row = first_row, error = %e, "Cell write failed");
                failed.insert(first_row);
            }
        }
    }
    failed
}

async fn write_cells(
    store: &dyn RosterStore,
    column: &str,
    first_row: usize,
    values: &[String],
    report: &mut WriteReport,
    failed: &mut HashSet<usize>,
) {
    for (offset, value) in values.iter().enumerate() {
        let row = first_row + offset;
        match store.write_cell(row, column, value).await {
            Ok(()) => report.cells_written += 1,
            Err(e) => {
                tracing::warn!(column, row, error = %e, "Cell write failed");
                failed.insert(row);
            }
        }
    }
}
