//! rollcall-roster: the roster store seam.
//!
//! The roster is a tabular record (header row plus one row per participant)
//! owned by an external service. The engine talks to it only through
//! [`RosterStore`]: read every row, write a cell or a column range, delete
//! a row. Two stores ship here: an in-memory grid and a JSON file.

pub mod client;
pub mod file;
pub mod grid;
pub mod memory;
pub mod schema;

pub use client::{Result, RosterError, RosterRow, RosterSheet, RosterStore};
pub use file::FileRoster;
pub use grid::Grid;
pub use memory::MemoryRoster;
