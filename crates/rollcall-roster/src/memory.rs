//! In-memory roster store.
//!
//! Used by tests and by hosts that keep the roster themselves.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::client::{Result, RosterSheet, RosterStore};
use crate::grid::Grid;

/// Thread-safe roster held in memory. Clone is cheap (inner Arc).
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    grid: Arc<RwLock<Grid>>,
}

impl MemoryRoster {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid: Arc::new(RwLock::new(grid)),
        }
    }

    /// Copy of the current grid.
    pub async fn snapshot(&self) -> Grid {
        self.grid.read().await.clone()
    }
}

#[async_trait]
impl RosterStore for MemoryRoster {
    async fn read_all_rows(&self, expected: &[&str]) -> Result<RosterSheet> {
        self.grid.read().await.read(expected)
    }

    async fn write_cell(&self, row: usize, column: &str, value: &str) -> Result<()> {
        self.grid.write().await.set(row, column, value)
    }

    async fn write_range(&self, first_row: usize, column: &str, values: &[String]) -> Result<()> {
        self.grid.write().await.set_range(first_row, column, values)
    }

    async fn delete_row(&self, row: usize) -> Result<()> {
        self.grid.write().await.delete(row)
    }
}
