//! Error types for the rollcall-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Roster error: {0}")]
    Roster(#[from] rollcall_roster::RosterError),

    #[error("Invalid subnet prefix: {0}")]
    InvalidPrefix(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
