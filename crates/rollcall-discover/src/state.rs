//! Last-known status per address, used for change detection.
//!
//! Lives only in process memory and starts empty on every restart. The
//! first cycle after a restart falls back to the status already in the
//! roster, and records a transition when there is none.

use std::collections::HashMap;

use rollcall_core::PresenceStatus;

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    last_known: HashMap<String, PresenceStatus>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<PresenceStatus> {
        self.last_known.get(address).copied()
    }

    pub fn record(&mut self, address: &str, status: PresenceStatus) {
        self.last_known.insert(address.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.last_known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_known.is_empty()
    }
}
