//! Presence aggregation.
//!
//! The verdict set is the union of addresses that answered a probe and
//! addresses resolved in the neighbor table. Either signal alone misses
//! devices (ICMP filtered but associated; answered before the cache caught
//! up), so the union trades stale cache entries for fewer false absences.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use rollcall_core::{ProbeResult, VerdictSet};

pub fn aggregate(probes: &[ProbeResult], neighbors: &HashSet<Ipv4Addr>) -> VerdictSet {
    probes
        .iter()
        .filter(|p| p.reachable)
        .map(|p| p.address)
        .chain(neighbors.iter().copied())
        .collect()
}
