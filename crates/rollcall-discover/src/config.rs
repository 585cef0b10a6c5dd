//! Configuration for the rollcall-discover presence engine.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Top-level discover configuration.
///
/// Loaded from `rollcall.toml` `[discover]` section or
/// `ROLLCALL__DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Path of the JSON roster file.
    #[serde(default = "default_roster_path")]
    pub roster_path: String,

    /// Explicit subnet prefix to sweep (e.g. "10.0.0."), skipping detection.
    #[serde(default)]
    pub subnet_prefix: Option<String>,

    /// Prefix used when the local subnet cannot be detected.
    #[serde(default = "default_fallback_prefix")]
    pub fallback_prefix: String,

    /// Destination for the connected-UDP route lookup. Nothing is sent to it.
    #[serde(default = "default_route_probe_target")]
    pub route_probe_target: String,

    /// First host number of the sweep (inclusive).
    #[serde(default = "default_host_start")]
    pub host_start: u8,

    /// Last host number of the sweep (inclusive).
    #[serde(default = "default_host_end")]
    pub host_end: u8,

    /// Maximum probes in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_probes: usize,

    /// Path to the ping binary.
    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    /// Per-probe reply timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Wait between the sweep and the neighbor-table read, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Timer period of the daemon, in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Separator between status-log entries.
    #[serde(default = "default_log_separator")]
    pub log_separator: String,
}

impl DiscoverConfig {
    /// Load the `[discover]` section from `<file_prefix>.toml` (optional)
    /// and `ROLLCALL__DISCOVER__*` variables. A missing section gives the
    /// defaults; an unreadable one is logged and also gives the defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(file_prefix).required(false))
            .add_source(
                ::config::Environment::with_prefix("ROLLCALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DiscoverError::Config(e.to_string()))?;

        match cfg.get::<DiscoverConfig>("discover") {
            Ok(c) => Ok(c),
            Err(::config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid [discover] config section, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Reject settings that would make a cycle meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.host_start > self.host_end {
            return Err(DiscoverError::Config(format!(
                "host_start ({}) is greater than host_end ({})",
                self.host_start, self.host_end
            )));
        }
        if self.max_concurrent_probes == 0 {
            return Err(DiscoverError::Config(
                "max_concurrent_probes must be at least 1".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(DiscoverError::Config(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_roster_path() -> String {
    "./roster.json".to_string()
}

fn default_fallback_prefix() -> String {
    "192.168.1.".to_string()
}

fn default_route_probe_target() -> String {
    "8.8.8.8:80".to_string()
}

fn default_host_start() -> u8 {
    1
}

fn default_host_end() -> u8 {
    254
}

fn default_max_concurrent() -> usize {
    100
}

fn default_ping_path() -> String {
    "ping".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    1500
}

fn default_interval() -> u64 {
    60
}

fn default_log_separator() -> String {
    " | ".to_string()
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            subnet_prefix: None,
            fallback_prefix: default_fallback_prefix(),
            route_probe_target: default_route_probe_target(),
            host_start: default_host_start(),
            host_end: default_host_end(),
            max_concurrent_probes: default_max_concurrent(),
            ping_path: default_ping_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
            settle_ms: default_settle_ms(),
            interval_secs: default_interval(),
            log_separator: default_log_separator(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoverConfig::default();
        assert_eq!(config.fallback_prefix, "192.168.1.");
        assert_eq!((config.host_start, config.host_end), (1, 254));
        assert_eq!(config.max_concurrent_probes, 100);
        assert_eq!(config.probe_timeout(), Duration::from_secs(1));
        assert_eq!(config.interval_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: DiscoverConfig =
            serde_json::from_str(r#"{"subnet_prefix": "10.0.0.", "settle_ms": 10}"#).unwrap();
        assert_eq!(config.subnet_prefix.as_deref(), Some("10.0.0."));
        assert_eq!(config.settle_delay(), Duration::from_millis(10));
        assert_eq!(config.ping_path, "ping");
    }

    #[test]
    fn test_load_reads_discover_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rollcall.toml"),
            "[discover]\ninterval_secs = 300\nroster_path = \"/srv/roster.json\"\n",
        )
        .unwrap();

        let config = DiscoverConfig::load(dir.path().join("rollcall").to_str().unwrap()).unwrap();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.roster_path, "/srv/roster.json");
        assert_eq!(config.host_end, 254);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiscoverConfig::load(dir.path().join("absent").to_str().unwrap()).unwrap();
        assert_eq!(config.interval_secs, 60);
    }

    #[test]
    fn test_load_malformed_section_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rollcall.toml"),
            "[discover]\ninterval_secs = \"abc\"\n",
        )
        .unwrap();

        let config = DiscoverConfig::load(dir.path().join("rollcall").to_str().unwrap()).unwrap();
        assert_eq!(config.interval_secs, 60);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = DiscoverConfig {
            host_start: 200,
            host_end: 10,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DiscoverError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = DiscoverConfig {
            max_concurrent_probes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
