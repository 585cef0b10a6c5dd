//! Neighbor (ARP) table reading.
//!
//! Lists the OS address-resolution cache with whatever tool the platform
//! offers and extracts the IPv4 addresses of resolved entries:
//!
//! | Platform | Preferred        | Fallback  |
//! |----------|------------------|-----------|
//! | Linux    | `ip neigh show`  | `arp -an` |
//! | macOS    | `arp -an`        | none      |
//! | Windows  | `arp -a`         | none      |
//!
//! Entries that never resolved (`FAILED`, `INCOMPLETE`, `<incomplete>`) are
//! dropped: a sweep leaves one behind for every silent address. So are
//! broadcast and multicast mappings, which no device answers for.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::process::Stdio;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command;

use crate::platform::Platform;

lazy_static! {
    // 192.168.1.5 dev wlan0 lladdr aa:bb:cc:dd:ee:ff REACHABLE
    static ref RE_IP_NEIGH: Regex =
        Regex::new(r"^\s*(\d{1,3}(?:\.\d{1,3}){3})\s+dev\s+(\S+)").unwrap();
    static ref RE_LLADDR: Regex = Regex::new(r"\blladdr\s+(\S+)").unwrap();

    // ? (192.168.1.5) at aa:bb:cc:dd:ee:ff [ether] on wlan0
    static ref RE_ARP_AN: Regex =
        Regex::new(r"\((\d{1,3}(?:\.\d{1,3}){3})\)\s+at\s+(\S+)").unwrap();

    //   192.168.1.33          00-11-22-33-44-55     dynamic
    static ref RE_ARP_WINDOWS: Regex = Regex::new(
        r"^\s*(\d{1,3}(?:\.\d{1,3}){3})\s+([0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})\s+(\w+)"
    )
    .unwrap();
}

/// One row of a neighbor-cache listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub address: Ipv4Addr,
    /// `None` when the entry never resolved.
    pub hw_address: Option<String>,
}

impl NeighborEntry {
    /// Whether the entry maps to a single device.
    pub fn is_resolved(&self) -> bool {
        self.hw_address.as_deref().is_some_and(is_unicast_hw)
    }
}

/// True for a non-zero hardware address without the group bit set.
/// Accepts `:` or `-` separated octets, with or without leading zeros.
pub fn is_unicast_hw(hw: &str) -> bool {
    let Some(first) = hw
        .split([':', '-'])
        .next()
        .and_then(|octet| u8::from_str_radix(octet, 16).ok())
    else {
        return false;
    };
    let non_zero = hw.chars().any(|c| c.is_ascii_hexdigit() && c != '0');
    first & 0x01 == 0 && non_zero
}

/// Listing tools, each with its own output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    IpNeigh,
    ArpAn,
    ArpWindows,
}

impl ListingFormat {
    fn command(&self) -> (&'static str, &'static [&'static str]) {
        const IP_NEIGH_ARGS: &[&str] = &["neigh", "show"];
        const ARP_AN_ARGS: &[&str] = &["-an"];
        const ARP_ALL_ARGS: &[&str] = &["-a"];

        match self {
            Self::IpNeigh => ("ip", IP_NEIGH_ARGS),
            Self::ArpAn => ("arp", ARP_AN_ARGS),
            Self::ArpWindows => ("arp", ARP_ALL_ARGS),
        }
    }

    pub fn parse(&self, output: &str) -> Vec<NeighborEntry> {
        match self {
            Self::IpNeigh => parse_ip_neigh(output),
            Self::ArpAn => parse_arp_an(output),
            Self::ArpWindows => parse_arp_windows(output),
        }
    }

    /// Listing tools to try on `platform`, most preferred first.
    pub fn for_platform(platform: Platform) -> &'static [ListingFormat] {
        const UNIX: &[ListingFormat] = &[ListingFormat::IpNeigh, ListingFormat::ArpAn];
        const MACOS: &[ListingFormat] = &[ListingFormat::ArpAn];
        const WINDOWS: &[ListingFormat] = &[ListingFormat::ArpWindows];

        match platform {
            Platform::Unix => UNIX,
            Platform::MacOs => MACOS,
            Platform::Windows => WINDOWS,
        }
    }
}

pub fn parse_ip_neigh(output: &str) -> Vec<NeighborEntry> {
    output
        .lines()
        .filter_map(|line| {
            let caps = RE_IP_NEIGH.captures(line)?;
            let address = caps[1].parse().ok()?;
            let hw_address = RE_LLADDR.captures(line).map(|c| c[1].to_string());
            let failed = line
                .split_whitespace()
                .any(|tok| tok == "FAILED" || tok == "INCOMPLETE");
            Some(NeighborEntry {
                address,
                hw_address: hw_address.filter(|_| !failed),
            })
        })
        .collect()
}

pub fn parse_arp_an(output: &str) -> Vec<NeighborEntry> {
    output
        .lines()
        .filter_map(|line| {
            let caps = RE_ARP_AN.captures(line)?;
            let address = caps[1].parse().ok()?;
            let hw = &caps[2];
            Some(NeighborEntry {
                address,
                hw_address: (!hw.contains("incomplete")).then(|| hw.to_string()),
            })
        })
        .collect()
}

pub fn parse_arp_windows(output: &str) -> Vec<NeighborEntry> {
    output
        .lines()
        .filter_map(|line| {
            let caps = RE_ARP_WINDOWS.captures(line)?;
            Some(NeighborEntry {
                address: caps[1].parse().ok()?,
                hw_address: Some(caps[2].to_string()),
            })
        })
        .collect()
}

/// Addresses of the resolved entries.
pub fn resolved_addresses(entries: &[NeighborEntry]) -> HashSet<Ipv4Addr> {
    entries
        .iter()
        .filter(|e| e.is_resolved())
        .map(|e| e.address)
        .collect()
}

/// Source of currently known neighbors. Never fails; worst case is empty.
#[async_trait]
pub trait NeighborSource: Send + Sync {
    async fn read(&self) -> HashSet<Ipv4Addr>;
}

/// Reads the host's own neighbor cache.
pub struct SystemNeighborTable {
    formats: &'static [ListingFormat],
}

impl SystemNeighborTable {
    pub fn new() -> Self {
        Self {
            formats: ListingFormat::for_platform(Platform::current()),
        }
    }
}

impl Default for SystemNeighborTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NeighborSource for SystemNeighborTable {
    async fn read(&self) -> HashSet<Ipv4Addr> {
        for format in self.formats {
            let (program, args) = format.command();
            match run_listing(program, args).await {
                Ok(output) => {
                    let entries = format.parse(&output);
                    let addresses = resolved_addresses(&entries);
                    tracing::info!(
                        tool = program,
                        entries = entries.len(),
                        resolved = addresses.len(),
                        "Neighbor table read"
                    );
                    return addresses;
                }
                Err(e) => {
                    tracing::warn!(tool = program, error = %e, "Neighbor listing unavailable");
                }
            }
        }

        tracing::warn!("No neighbor listing tool succeeded, using empty table");
        HashSet::new()
    }
}

async fn run_listing(program: &str, args: &[&str]) -> std::io::Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
