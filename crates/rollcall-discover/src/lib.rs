//! rollcall-discover: presence detection for a roster of devices.
//!
//! Sweeps the local /24 with ping, reads the neighbor table, and writes a
//! present/absent verdict plus a change log back to the roster.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod neighbor;
pub mod persist;
pub mod platform;
pub mod prober;
pub mod reconcile;
pub mod scheduler;
pub mod state;
pub mod subnet;
