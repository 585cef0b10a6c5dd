//! Cycle driver.
//!
//! One cycle is: resolve subnet → probe sweep → settle → read neighbor
//! table → aggregate → clean up duplicates → reconcile → write back.
//! Cycles never overlap: a trigger that arrives while one is running is
//! dropped. The timer loop fires immediately, then every interval, and
//! only looks at the shutdown signal between cycles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use rollcall_roster::schema::{REQUIRED_COLUMNS, STATUS_LOG};
use rollcall_roster::RosterStore;

use crate::aggregate::aggregate;
use crate::config::DiscoverConfig;
use crate::error::Result;
use crate::neighbor::{NeighborSource, SystemNeighborTable};
use crate::persist;
use crate::prober::{self, PingProber, Prober};
use crate::reconcile::{self, ReconcileSummary, Reconciler};
use crate::subnet::SubnetResolver;

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub subnet: String,
    pub probed: u32,
    pub reachable: u32,
    pub neighbors: u32,
    pub verdicts: u32,
    pub deleted: u32,
    #[serde(flatten)]
    pub reconcile: ReconcileSummary,
    pub write_failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleSummary),
    /// Another cycle was running; this trigger was dropped.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: CycleOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Running,
}

/// Read-out for a hosting process.
#[derive(Debug, Clone, Serialize)]
pub struct DriverStatus {
    pub state: DriverState,
    pub last_cycle: Option<CycleReport>,
}

/// Runs presence cycles against one roster store.
pub struct CycleDriver {
    config: DiscoverConfig,
    store: Arc<dyn RosterStore>,
    resolver: SubnetResolver,
    prober: Arc<dyn Prober>,
    neighbors: Arc<dyn NeighborSource>,
    // Held for the whole cycle; also the non-reentrancy guard.
    reconciler: Mutex<Reconciler>,
    last_cycle: RwLock<Option<CycleReport>>,
}

impl CycleDriver {
    pub fn new(
        config: DiscoverConfig,
        store: Arc<dyn RosterStore>,
        resolver: SubnetResolver,
        prober: Arc<dyn Prober>,
        neighbors: Arc<dyn NeighborSource>,
    ) -> Self {
        let reconciler = Mutex::new(Reconciler::new(&config.log_separator));
        Self {
            config,
            store,
            resolver,
            prober,
            neighbors,
            reconciler,
            last_cycle: RwLock::new(None),
        }
    }

    /// Driver using the system `ping` and neighbor-table tools.
    pub fn from_config(config: DiscoverConfig, store: Arc<dyn RosterStore>) -> Result<Self> {
        config.validate()?;
        let resolver = SubnetResolver::from_config(&config)?;
        let prober = Arc::new(PingProber::from_config(&config));
        let neighbors = Arc::new(SystemNeighborTable::new());
        Ok(Self::new(config, store, resolver, prober, neighbors))
    }

    pub async fn status(&self) -> DriverStatus {
        let state = match self.reconciler.try_lock() {
            Ok(_) => DriverState::Idle,
            Err(_) => DriverState::Running,
        };
        DriverStatus {
            state,
            last_cycle: self.last_cycle.read().await.clone(),
        }
    }

    /// Run one cycle now. Never fails: errors end up in the report.
    pub async fn run_once(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();

        let Ok(mut reconciler) = self.reconciler.try_lock() else {
            tracing::info!(cycle_id = %cycle_id, "Cycle already running, trigger dropped");
            return CycleReport {
                cycle_id,
                started_at,
                finished_at: Utc::now(),
                outcome: CycleOutcome::Skipped,
            };
        };

        tracing::info!(cycle_id = %cycle_id, "Cycle started");

        let outcome = match self.run_single_cycle(&mut reconciler, cycle_id).await {
            Ok(summary) => CycleOutcome::Completed(summary),
            Err(e) => {
                tracing::error!(cycle_id = %cycle_id, error = %e, "Cycle failed");
                CycleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            outcome,
        };
        *self.last_cycle.write().await = Some(report.clone());
        report
    }

    /// Run a cycle now and then every `period` until `shutdown` turns true.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = period.as_secs(), "Cycle driver started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Cycle driver stopped");
    }

    /// Execute a single cycle: sweep → neighbors → aggregate → reconcile → write.
    async fn run_single_cycle(
        &self,
        reconciler: &mut Reconciler,
        cycle_id: Uuid,
    ) -> Result<CycleSummary> {
        let start = Instant::now();

        let subnet = self.resolver.resolve().await;
        tracing::info!(cycle_id = %cycle_id, subnet = %subnet.network(), "Scanning subnet");

        let targets = subnet
            .hosts(self.config.host_start, self.config.host_end)
            .collect();
        let probes = prober::sweep(
            self.prober.clone(),
            targets,
            self.config.max_concurrent_probes,
        )
        .await;

        tokio::time::sleep(self.config.settle_delay()).await;

        let neighbors = self.neighbors.read().await;
        let verdicts = aggregate(&probes, &neighbors);

        let mut sheet = self.store.read_all_rows(&REQUIRED_COLUMNS).await?;

        let stale = reconcile::stale_rows(&sheet);
        let deleted = persist::delete_stale_rows(self.store.as_ref(), &stale).await;
        if deleted > 0 {
            sheet = self.store.read_all_rows(&REQUIRED_COLUMNS).await?;
        }

        let entries = reconcile::entries_from_sheet(&sheet);
        let plan = reconciler.plan(&entries, &verdicts, Utc::now());
        let writes = persist::apply_updates(
            self.store.as_ref(),
            &plan.updates,
            sheet.has_column(STATUS_LOG),
        )
        .await;
        reconciler.commit(&plan, &writes.failed_log);

        let summary = CycleSummary {
            subnet: subnet.to_string(),
            probed: probes.len() as u32,
            reachable: probes.iter().filter(|p| p.reachable).count() as u32,
            neighbors: neighbors.len() as u32,
            verdicts: verdicts.len() as u32,
            deleted,
            reconcile: plan.summary.clone(),
            write_failures: writes.failures(),
        };

        tracing::info!(
            cycle_id = %cycle_id,
            subnet = %summary.subnet,
            verdicts = summary.verdicts,
            present = summary.reconcile.present,
            absent = summary.reconcile.absent,
            unsupported = summary.reconcile.unsupported,
            transitions = summary.reconcile.transitions,
            deleted = summary.deleted,
            write_failures = summary.write_failures,
            duration_ms = start.elapsed().as_millis(),
            "Cycle complete"
        );

        Ok(summary)
    }
}
