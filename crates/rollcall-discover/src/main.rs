//! CLI entry point for the rollcall presence daemon.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use rollcall_roster::FileRoster;

use rollcall_discover::config::DiscoverConfig;
use rollcall_discover::scheduler::{CycleDriver, CycleOutcome};

#[derive(Parser)]
#[command(name = "rollcall-discover")]
#[command(about = "Mark roster devices present or absent from the local network")]
struct Cli {
    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Run as daemon, one cycle per interval.
    #[arg(long)]
    daemon: bool,

    /// Override the daemon interval in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Override the roster file path.
    #[arg(long)]
    roster: Option<String>,

    /// Sweep this prefix (e.g., 10.0.0.) instead of detecting it.
    #[arg(long)]
    subnet: Option<String>,

    /// Config file prefix (default: rollcall).
    #[arg(short, long, default_value = "rollcall")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let mut discover_config = DiscoverConfig::load(&cli.config)?;
    if let Some(path) = &cli.roster {
        discover_config.roster_path = path.clone();
    }
    if let Some(prefix) = &cli.subnet {
        discover_config.subnet_prefix = Some(prefix.clone());
    }
    if let Some(secs) = cli.interval {
        discover_config.interval_secs = secs;
    }

    let store = Arc::new(FileRoster::new(&discover_config.roster_path));
    tracing::info!(roster = %discover_config.roster_path, "Using roster file");

    let period = discover_config.interval();
    let driver = CycleDriver::from_config(discover_config, store)?;

    if cli.once {
        let report = driver.run_once().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if let CycleOutcome::Failed { error } = report.outcome {
            anyhow::bail!("Cycle failed: {error}");
        }
    } else if cli.daemon {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested, stopping after the current cycle");
                let _ = shutdown_tx.send(true);
            }
        });
        driver.run(period, shutdown_rx).await;
    } else {
        anyhow::bail!("Specify --once (single cycle) or --daemon (scheduled cycles)");
    }

    Ok(())
}
