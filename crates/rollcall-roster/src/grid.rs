//! Plain string grid shared by the bundled stores.
//!
//! Holds a header row and data rows exactly as a spreadsheet export would,
//! and implements the row/column addressing rules of [`RosterStore`].
//!
//! [`RosterStore`]: crate::client::RosterStore

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::client::{Result, RosterError, RosterRow, RosterSheet};

/// First data row; row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Last occupied store row (1 when there is no data).
    pub fn last_row(&self) -> usize {
        self.rows.len() + 1
    }

    /// Raw cell text, if the row and column exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column).ok()?;
        let idx = self.data_index(row).ok()?;
        Some(self.rows[idx].get(col).map(String::as_str).unwrap_or(""))
    }

    /// Build the trimmed read model, checking `expected` columns are present.
    pub fn read(&self, expected: &[&str]) -> Result<RosterSheet> {
        let headers: Vec<String> = self.headers.iter().map(|h| h.trim().to_string()).collect();

        // First occurrence of a repeated header wins.
        let mut columns: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            if !name.is_empty() {
                columns.entry(name.as_str()).or_insert(idx);
            }
        }

        let missing: Vec<String> = expected
            .iter()
            .filter(|name| !columns.contains_key(name.trim()))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RosterError::MissingColumns(missing));
        }

        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, cells)| RosterRow {
                row: i + FIRST_DATA_ROW,
                values: columns
                    .iter()
                    .map(|(name, &col)| {
                        let value = cells.get(col).map(|v| v.trim()).unwrap_or("");
                        (name.to_string(), value.to_string())
                    })
                    .collect(),
            })
            .collect();

        Ok(RosterSheet { headers, rows })
    }

    pub fn set(&mut self, row: usize, column: &str, value: &str) -> Result<()> {
        let col = self.column_index(column)?;
        let idx = self.data_index(row)?;
        put(&mut self.rows[idx], col, value);
        Ok(())
    }

    /// Write a column range. Validated up front so a bad range changes nothing.
    pub fn set_range(&mut self, first_row: usize, column: &str, values: &[String]) -> Result<()> {
        let col = self.column_index(column)?;
        if values.is_empty() {
            return Ok(());
        }
        let first = self.data_index(first_row)?;
        self.data_index(first_row + values.len() - 1)?;

        for (offset, value) in values.iter().enumerate() {
            put(&mut self.rows[first + offset], col, value);
        }
        Ok(())
    }

    pub fn delete(&mut self, row: usize) -> Result<()> {
        let idx = self.data_index(row)?;
        self.rows.remove(idx);
        Ok(())
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        let column = column.trim();
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| RosterError::UnknownColumn(column.to_string()))
    }

    fn data_index(&self, row: usize) -> Result<usize> {
        if row < FIRST_DATA_ROW || row > self.last_row() {
            return Err(RosterError::RowOutOfRange {
                row,
                last: self.last_row(),
            });
        }
        Ok(row - FIRST_DATA_ROW)
    }
}

fn put(cells: &mut Vec<String>, col: usize, value: &str) {
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = value.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        let mut grid = Grid::new([" Name ", "IP", "Status", "Name"]);
        grid.push_row([" Ada ", " 10.0.0.1 ", "Present", "shadow"]);
        grid.push_row(["Bob", "10.0.0.2"]);
        grid
    }

    #[test]
    fn test_read_trims_keys_and_values() {
        let sheet = sample().read(&["Name", "IP"]).unwrap();
        assert_eq!(sheet.headers[0], "Name");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row, 2);
        assert_eq!(sheet.rows[0].get("Name"), "Ada");
        assert_eq!(sheet.rows[0].get("IP"), "10.0.0.1");
        assert_eq!(sheet.rows[1].row, 3);
    }

    #[test]
    fn test_read_first_duplicate_header_wins() {
        let sheet = sample().read(&[]).unwrap();
        assert_eq!(sheet.rows[0].get("Name"), "Ada");
    }

    #[test]
    fn test_read_short_row_reads_empty() {
        let sheet = sample().read(&["Status"]).unwrap();
        assert_eq!(sheet.rows[1].get("Status"), "");
    }

    #[test]
    fn test_read_missing_columns() {
        let err = sample().read(&["Name", "Email"]).unwrap_err();
        assert!(matches!(err, RosterError::MissingColumns(ref cols) if cols == &["Email"]));
    }

    #[test]
    fn test_set_pads_short_row() {
        let mut grid = sample();
        grid.set(3, "Status", "Invalid Wi-Fi").unwrap();
        assert_eq!(grid.cell(3, "Status"), Some("Invalid Wi-Fi"));
    }

    #[test]
    fn test_set_rejects_header_and_out_of_range() {
        let mut grid = sample();
        assert!(matches!(
            grid.set(1, "Status", "x"),
            Err(RosterError::RowOutOfRange { row: 1, .. })
        ));
        assert!(matches!(
            grid.set(4, "Status", "x"),
            Err(RosterError::RowOutOfRange { row: 4, last: 3 })
        ));
        assert!(matches!(
            grid.set(2, "Nope", "x"),
            Err(RosterError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_set_range_is_all_or_nothing() {
        let mut grid = sample();
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(grid.set_range(2, "Status", &values).is_err());
        assert_eq!(grid.cell(2, "Status"), Some("Present"));

        grid.set_range(2, "Status", &values[..2]).unwrap();
        assert_eq!(grid.cell(2, "Status"), Some("a"));
        assert_eq!(grid.cell(3, "Status"), Some("b"));
    }

    #[test]
    fn test_delete_shifts_rows_up() {
        let mut grid = sample();
        grid.delete(2).unwrap();
        assert_eq!(grid.last_row(), 2);
        assert_eq!(grid.cell(2, "Name"), Some("Bob"));
    }
}
