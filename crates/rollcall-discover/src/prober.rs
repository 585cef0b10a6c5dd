//! Liveness prober.
//!
//! Sends one echo request per address with the system `ping` binary, run
//! as a child process via `tokio::process::Command`. A semaphore bounds the
//! number of probes in flight. The sweep's main purpose is to make the OS
//! resolve every neighbor, so its results are only half of the verdict.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rollcall_core::ProbeResult;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::config::DiscoverConfig;
use crate::platform::Platform;

/// Extra time a child gets past its own timeout before it is killed.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// A single-address liveness check. Failures of any kind mean "unreachable".
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: Ipv4Addr) -> bool;
}

/// Probes with the system `ping` binary.
pub struct PingProber {
    ping_path: String,
    timeout: Duration,
    platform: Platform,
}

impl PingProber {
    pub fn new(ping_path: &str, timeout: Duration) -> Self {
        Self {
            ping_path: ping_path.to_string(),
            timeout,
            platform: Platform::current(),
        }
    }

    pub fn from_config(config: &DiscoverConfig) -> Self {
        Self::new(&config.ping_path, config.probe_timeout())
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: Ipv4Addr) -> bool {
        let mut command = Command::new(&self.ping_path);
        command
            .args(ping_args(self.platform, address, self.timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout + KILL_GRACE, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "Probe could not be launched");
                false
            }
            Err(_) => {
                tracing::debug!(address = %address, "Probe overran its timeout");
                false
            }
        }
    }
}

/// Arguments for one echo request with a reply timeout.
pub fn ping_args(platform: Platform, address: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let (count_flag, wait) = match platform {
        Platform::Windows => ("-n", ("-w", timeout.as_millis().to_string())),
        Platform::MacOs => ("-c", ("-W", timeout.as_millis().to_string())),
        Platform::Unix => ("-c", ("-W", whole_seconds(timeout).to_string())),
    };
    vec![
        count_flag.to_string(),
        "1".to_string(),
        wait.0.to_string(),
        wait.1,
        address.to_string(),
    ]
}

fn whole_seconds(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

/// Probe every address, at most `max_concurrent` at a time.
///
/// Never fails: a probe that cannot run, or whose task dies, is recorded as
/// unreachable. Results come back in input order.
pub async fn sweep(
    prober: Arc<dyn Prober>,
    addresses: Vec<Ipv4Addr>,
    max_concurrent: usize,
) -> Vec<ProbeResult> {
    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(addresses.len());

    for address in addresses {
        let prober = prober.clone();
        let semaphore = semaphore.clone();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return false;
            };
            prober.probe(address).await
        });
        handles.push((address, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (address, handle) in handles {
        let reachable = match handle.await {
            Ok(reachable) => reachable,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Probe task failed");
                false
            }
        };
        results.push(ProbeResult { address, reachable });
    }

    tracing::info!(
        probed = results.len(),
        reachable = results.iter().filter(|r| r.reachable).count(),
        duration_ms = start.elapsed().as_millis(),
        "Probe sweep complete"
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers for a fixed set of addresses and tracks peak concurrency.
    struct FakeProber {
        alive: HashSet<Ipv4Addr>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeProber {
        fn new(alive: &[Ipv4Addr]) -> Self {
            Self {
                alive: alive.iter().copied().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, address: Ipv4Addr) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.alive.contains(&address)
        }
    }

    fn segment(n: u8) -> Vec<Ipv4Addr> {
        (1..=n).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect()
    }

    #[test]
    fn test_ping_args_per_platform() {
        let ip = Ipv4Addr::new(10, 0, 0, 7);
        let timeout = Duration::from_millis(1000);
        assert_eq!(
            ping_args(Platform::Unix, ip, timeout),
            vec!["-c", "1", "-W", "1", "10.0.0.7"]
        );
        assert_eq!(
            ping_args(Platform::Windows, ip, timeout),
            vec!["-n", "1", "-w", "1000", "10.0.0.7"]
        );
        assert_eq!(
            ping_args(Platform::MacOs, ip, timeout),
            vec!["-c", "1", "-W", "1000", "10.0.0.7"]
        );
    }

    #[test]
    fn test_unix_wait_rounds_up_to_whole_seconds() {
        assert_eq!(whole_seconds(Duration::from_millis(200)), 1);
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_sweep_reports_every_address_in_order() {
        let alive = [Ipv4Addr::new(10, 0, 0, 3), Ipv4Addr::new(10, 0, 0, 9)];
        let prober = Arc::new(FakeProber::new(&alive));

        let results = sweep(prober, segment(20), 8).await;

        assert_eq!(results.len(), 20);
        assert_eq!(results[0].address, Ipv4Addr::new(10, 0, 0, 1));
        let reachable: Vec<_> = results
            .iter()
            .filter(|r| r.reachable)
            .map(|r| r.address)
            .collect();
        assert_eq!(reachable, alive);
    }

    #[tokio::test]
    async fn test_sweep_respects_concurrency_ceiling() {
        let prober = Arc::new(FakeProber::new(&[]));
        sweep(prober.clone(), segment(50), 4).await;
        let peak = prober.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak} exceeded ceiling");
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_missing_ping_binary_counts_as_unreachable() {
        let prober = Arc::new(PingProber::new(
            "/nonexistent/rollcall-ping",
            Duration::from_millis(100),
        ));
        let results = sweep(prober, segment(3), 2).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.reachable));
    }
}
