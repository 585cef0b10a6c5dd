//! JSON-file roster store.
//!
//! The roster is kept as a single pretty-printed JSON document:
//! ```text
//! {
//!   "headers": ["Timestamp", "Email address", ...],
//!   "rows": [["2024-03-01 09:00:00", "ada@example.com", ...], ...]
//! }
//! ```
//! Every mutation rewrites the file through a temporary sibling and a
//! rename, so a reader never sees a half-written roster.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::client::{Result, RosterError, RosterSheet, RosterStore};
use crate::grid::Grid;

pub struct FileRoster {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `grid` as the full roster, creating the file if needed.
    pub async fn save(&self, grid: &Grid) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store(grid).await
    }

    async fn load(&self) -> Result<Grid> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RosterError::NotFound {
                    path: self.path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    async fn store(&self, grid: &Grid) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(grid)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), rows = grid.rows.len(), "Roster saved");
        Ok(())
    }

    async fn modify<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Grid) -> Result<()> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut grid = self.load().await?;
        op(&mut grid)?;
        self.store(&grid).await
    }
}

#[async_trait]
impl RosterStore for FileRoster {
    async fn read_all_rows(&self, expected: &[&str]) -> Result<RosterSheet> {
        let _guard = self.lock.lock().await;
        self.load().await?.read(expected)
    }

    async fn write_cell(&self, row: usize, column: &str, value: &str) -> Result<()> {
        self.modify(|grid| grid.set(row, column, value)).await
    }

    async fn write_range(&self, first_row: usize, column: &str, values: &[String]) -> Result<()> {
        self.modify(|grid| grid.set_range(first_row, column, values))
            .await
    }

    async fn delete_row(&self, row: usize) -> Result<()> {
        self.modify(|grid| grid.delete(row)).await
    }
}
