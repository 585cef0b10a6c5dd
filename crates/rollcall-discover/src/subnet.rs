//! Local subnet detection.
//!
//! The sweep covers the /24 around the host's outbound IPv4 address. That
//! address is found by connecting a UDP socket towards a public destination
//! and reading back the local end; no datagram is ever sent. Any failure
//! falls back to a fixed prefix so a cycle never aborts here.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use ipnet::Ipv4Net;
use tokio::net::UdpSocket;

use crate::config::DiscoverConfig;
use crate::error::{DiscoverError, Result};

const SEGMENT_PREFIX_LEN: u8 = 24;

/// A /24 segment, displayed as its first three octets plus a dot ("10.0.0.").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetPrefix {
    net: Ipv4Net,
}

impl SubnetPrefix {
    /// The /24 containing `ip`.
    pub fn containing(ip: Ipv4Addr) -> Result<Self> {
        let net = Ipv4Net::new(ip, SEGMENT_PREFIX_LEN)
            .map_err(|e| DiscoverError::InvalidPrefix(e.to_string()))?;
        Ok(Self { net: net.trunc() })
    }

    /// Parse "a.b.c." (trailing dot optional) or a "/24" CIDR.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.contains('/') {
            let net: Ipv4Net = raw
                .parse()
                .map_err(|_| DiscoverError::InvalidPrefix(raw.to_string()))?;
            if net.prefix_len() != SEGMENT_PREFIX_LEN {
                return Err(DiscoverError::InvalidPrefix(format!(
                    "{raw}: only /{SEGMENT_PREFIX_LEN} segments are supported"
                )));
            }
            return Ok(Self { net: net.trunc() });
        }

        let octets: Vec<u8> = raw
            .trim_end_matches('.')
            .split('.')
            .map(|part| part.parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| DiscoverError::InvalidPrefix(raw.to_string()))?;

        match octets.as_slice() {
            [a, b, c] => Self::containing(Ipv4Addr::new(*a, *b, *c, 0)),
            _ => Err(DiscoverError::InvalidPrefix(raw.to_string())),
        }
    }

    pub fn network(&self) -> Ipv4Net {
        self.net
    }

    /// Address of host number `n` within the segment.
    pub fn host(&self, n: u8) -> Ipv4Addr {
        let [a, b, c, _] = self.net.network().octets();
        Ipv4Addr::new(a, b, c, n)
    }

    /// Addresses for host numbers `start..=end`.
    pub fn hosts(&self, start: u8, end: u8) -> impl Iterator<Item = Ipv4Addr> + '_ {
        (start..=end).map(move |n| self.host(n))
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, _] = self.net.network().octets();
        write!(f, "{a}.{b}.{c}.")
    }
}

/// Decides which segment a cycle sweeps.
#[derive(Debug, Clone)]
pub struct SubnetResolver {
    route_probe_target: String,
    fallback: SubnetPrefix,
    fixed: Option<SubnetPrefix>,
}

impl SubnetResolver {
    pub fn new(route_probe_target: &str, fallback: SubnetPrefix) -> Self {
        Self {
            route_probe_target: route_probe_target.to_string(),
            fallback,
            fixed: None,
        }
    }

    /// Build from config. Fails only on an unparsable configured prefix.
    pub fn from_config(config: &DiscoverConfig) -> Result<Self> {
        let mut resolver = Self::new(
            &config.route_probe_target,
            SubnetPrefix::parse(&config.fallback_prefix)?,
        );
        if let Some(raw) = &config.subnet_prefix {
            resolver.fixed = Some(SubnetPrefix::parse(raw)?);
        }
        Ok(resolver)
    }

    pub fn fallback(&self) -> SubnetPrefix {
        self.fallback
    }

    /// Resolve the segment to sweep. Never fails.
    pub async fn resolve(&self) -> SubnetPrefix {
        if let Some(fixed) = self.fixed {
            return fixed;
        }

        match outbound_ipv4(&self.route_probe_target).await {
            Ok(ip) => match SubnetPrefix::containing(ip) {
                Ok(prefix) => {
                    tracing::debug!(local_ip = %ip, subnet = %prefix, "Detected local subnet");
                    prefix
                }
                Err(e) => self.fall_back(&e.to_string()),
            },
            Err(e) => self.fall_back(&e.to_string()),
        }
    }

    fn fall_back(&self, reason: &str) -> SubnetPrefix {
        tracing::warn!(
            error = %reason,
            fallback = %self.fallback,
            "Subnet detection failed, using fallback prefix"
        );
        self.fallback
    }
}

/// Local IPv4 address the OS would route `target` through.
async fn outbound_ipv4(target: &str) -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(target).await?;

    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Ok(ip),
        other => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no routable IPv4 interface (got {other})"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> SubnetPrefix {
        SubnetPrefix::parse("192.168.1.").unwrap()
    }

    #[test]
    fn test_prefix_display_truncates_to_three_octets() {
        let prefix = SubnetPrefix::containing(Ipv4Addr::new(10, 158, 108, 77)).unwrap();
        assert_eq!(prefix.to_string(), "10.158.108.");
        assert_eq!(prefix.network().to_string(), "10.158.108.0/24");
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(SubnetPrefix::parse("10.0.0.").unwrap().to_string(), "10.0.0.");
        assert_eq!(SubnetPrefix::parse("10.0.0").unwrap().to_string(), "10.0.0.");
        assert_eq!(
            SubnetPrefix::parse("10.0.0.0/24").unwrap().to_string(),
            "10.0.0."
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SubnetPrefix::parse("10.0.").is_err());
        assert!(SubnetPrefix::parse("10.0.300.").is_err());
        assert!(SubnetPrefix::parse("10.0.0.0/16").is_err());
        assert!(SubnetPrefix::parse("fe80::").is_err());
    }

    #[test]
    fn test_hosts_inclusive_range() {
        let prefix = SubnetPrefix::parse("10.0.0.").unwrap();
        let hosts: Vec<_> = prefix.hosts(1, 254).collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(10, 0, 0, 254));
    }

    #[tokio::test]
    async fn test_unresolvable_route_falls_back() {
        let resolver = SubnetResolver::new("not-an-address", fallback());
        assert_eq!(resolver.resolve().await.to_string(), "192.168.1.");
    }

    #[tokio::test]
    async fn test_loopback_route_falls_back() {
        let resolver = SubnetResolver::new("127.0.0.1:9", fallback());
        assert_eq!(resolver.resolve().await, fallback());
    }

    #[tokio::test]
    async fn test_configured_prefix_wins() {
        let config = DiscoverConfig {
            subnet_prefix: Some("10.1.2.".to_string()),
            route_probe_target: "not-an-address".to_string(),
            ..Default::default()
        };
        let resolver = SubnetResolver::from_config(&config).unwrap();
        assert_eq!(resolver.resolve().await.to_string(), "10.1.2.");
    }

    #[test]
    fn test_from_config_rejects_bad_fallback() {
        let config = DiscoverConfig {
            fallback_prefix: "nope".to_string(),
            ..Default::default()
        };
        assert!(SubnetResolver::from_config(&config).is_err());
    }
}
