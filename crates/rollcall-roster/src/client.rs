//! Roster store interface and read model.

use std::collections::HashMap;

use async_trait::async_trait;

/// Errors from roster store operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Roster not found at path: {path}")]
    NotFound { path: String },

    #[error("Roster is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unknown roster column: {0}")]
    UnknownColumn(String),

    #[error("Row {row} is outside the data range (rows 2..={last})")]
    RowOutOfRange { row: usize, last: usize },

    #[error("Store rejected the operation: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;

/// One data row, keyed by trimmed header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based store row; the header is row 1, so data starts at 2.
    pub row: usize,
    pub values: HashMap<String, String>,
}

impl RosterRow {
    /// Trimmed value of `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Result of reading the whole roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RosterRow>,
}

impl RosterSheet {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Operations the engine needs from a roster store.
///
/// Rows are 1-based with the header at row 1. Columns are addressed by
/// header name. Deleting a row shifts every later row up by one.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Read every data row. Each name in `expected` must be a header.
    async fn read_all_rows(&self, expected: &[&str]) -> Result<RosterSheet>;

    /// Write one cell.
    async fn write_cell(&self, row: usize, column: &str, value: &str) -> Result<()>;

    /// Write `values` down `column`, starting at `first_row`.
    async fn write_range(&self, first_row: usize, column: &str, values: &[String]) -> Result<()>;

    /// Delete one row.
    async fn delete_row(&self, row: usize) -> Result<()>;
}
