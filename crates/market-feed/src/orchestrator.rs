//! Periodic update orchestrator.
//!
//! Each cycle force-refreshes the priority dataset, then walks the remaining
//! datasets in a fixed order with a pause between each, refreshing only
//! those that are stale. A failing dataset never stops the cycle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{DatasetCache, FailureAction, RefreshOutcome};
use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::models::DatasetKey;

/// Refreshed unconditionally at the start of every cycle.
pub const PRIORITY_DATASET: DatasetKey = DatasetKey::BitcoinNetwork;

/// Outcome of one dataset within a cycle.
#[derive(Clone, Debug)]
pub struct DatasetRun {
    pub key: DatasetKey,
    /// Refreshed regardless of staleness.
    pub forced: bool,
    pub outcome: RefreshOutcome,
}

/// Ordered record of one cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub started_at: i64,
    pub finished_at: i64,
    pub runs: Vec<DatasetRun>,
    /// Stopped early by shutdown.
    pub interrupted: bool,
}

impl CycleReport {
    /// Datasets in the order they were visited.
    pub fn keys(&self) -> Vec<DatasetKey> {
        self.runs.iter().map(|r| r.key).collect()
    }

    pub fn failed(&self) -> Vec<DatasetKey> {
        self.runs
            .iter()
            .filter(|r| r.outcome.is_failure())
            .map(|r| r.key)
            .collect()
    }

    pub fn refreshed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| matches!(r.outcome, RefreshOutcome::Refreshed))
            .count()
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            visited: self.runs.len(),
            refreshed: self.refreshed(),
            failed: self.failed().len(),
            duration_ms: (self.finished_at - self.started_at).max(0),
            interrupted: self.interrupted,
        }
    }
}

/// Counts for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub visited: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub duration_ms: i64,
    pub interrupted: bool,
}

pub struct UpdateOrchestrator {
    cache: Arc<DatasetCache>,
    clock: Arc<dyn Clock>,
    schedule: ScheduleConfig,
}

impl UpdateOrchestrator {
    pub fn new(cache: Arc<DatasetCache>, clock: Arc<dyn Clock>, schedule: ScheduleConfig) -> Self {
        Self {
            cache,
            clock,
            schedule,
        }
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        self.cycle(None).await
    }

    async fn cycle(&self, mut shutdown: Option<&mut watch::Receiver<bool>>) -> CycleReport {
        let started_at = self.clock.now_millis();
        info!(datasets = DatasetKey::ALL.len(), "Update cycle started");

        let mut runs = Vec::with_capacity(DatasetKey::ALL.len());
        let mut interrupted = false;

        let outcome = self.cache.refresh(PRIORITY_DATASET).await;
        match &outcome {
            RefreshOutcome::Refreshed => self.log_priority_summary(),
            other => log_outcome(PRIORITY_DATASET, other),
        }
        runs.push(DatasetRun {
            key: PRIORITY_DATASET,
            forced: true,
            outcome,
        });

        for key in DatasetKey::ALL.into_iter().filter(|k| *k != PRIORITY_DATASET) {
            if !self
                .pause(self.schedule.dataset_delay, shutdown.as_deref_mut())
                .await
            {
                interrupted = true;
                break;
            }
            let outcome = self.cache.refresh_if_stale(key).await;
            log_outcome(key, &outcome);
            runs.push(DatasetRun {
                key,
                forced: false,
                outcome,
            });
        }

        let report = CycleReport {
            started_at,
            finished_at: self.clock.now_millis(),
            runs,
            interrupted,
        };
        let summary = report.summary();
        info!(
            visited = summary.visited,
            refreshed = summary.refreshed,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            interrupted = summary.interrupted,
            "Update cycle finished"
        );
        report
    }

    /// Sleep on the clock. Returns false when shutdown was requested first.
    async fn pause(&self, duration: Duration, shutdown: Option<&mut watch::Receiver<bool>>) -> bool {
        match shutdown {
            None => {
                self.clock.sleep(duration).await;
                true
            }
            Some(rx) => {
                if *rx.borrow() {
                    return false;
                }
                tokio::select! {
                    _ = self.clock.sleep(duration) => true,
                    // A dropped sender counts as shutdown.
                    _ = rx.changed() => false,
                }
            }
        }
    }

    fn log_priority_summary(&self) {
        let Some(value) = self.cache.get(PRIORITY_DATASET) else {
            return;
        };
        let Some(snapshot) = value.as_bitcoin_network() else {
            return;
        };
        info!(
            price = %snapshot.market.price,
            change_24h_pct = snapshot.market.change_24h_pct,
            block_height = snapshot.network.block_height,
            hash_rate_ehs = snapshot.network.hash_rate_ehs,
            fastest_fee = snapshot.mempool.fastest_fee,
            fear_greed = snapshot.sentiment.as_ref().map(|s| s.value),
            blocks_to_halving = snapshot.halving.as_ref().map(|h| h.blocks_remaining),
            degraded = snapshot.degraded.len(),
            "Bitcoin network refreshed"
        );
    }

    /// Run cycles on a fixed period until the handle is shut down.
    ///
    /// A cycle that overruns the period is followed immediately by the next.
    pub fn spawn(self: Arc<Self>) -> OrchestratorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!(
                interval_secs = self.schedule.update_interval.as_secs(),
                dataset_delay_ms = self.schedule.dataset_delay.as_millis() as u64,
                "Update orchestrator started"
            );
            loop {
                let report = self.cycle(Some(&mut shutdown_rx)).await;
                if report.interrupted {
                    break;
                }
                let elapsed = Duration::from_millis(report.summary().duration_ms as u64);
                let wait = self.schedule.update_interval.saturating_sub(elapsed);
                if !self.pause(wait, Some(&mut shutdown_rx)).await {
                    break;
                }
            }
            info!("Update orchestrator stopped");
        });

        OrchestratorHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

fn log_outcome(key: DatasetKey, outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Fresh => debug!(dataset = key.as_str(), "Dataset still fresh"),
        RefreshOutcome::Refreshed => info!(dataset = key.as_str(), "Dataset updated"),
        RefreshOutcome::Failed { error, action } => {
            if *action == FailureAction::Evicted {
                warn!(dataset = key.as_str(), "Dataset unavailable until next success: {}", error);
            } else {
                warn!(dataset = key.as_str(), action = ?action, "Dataset update failed: {}", error);
            }
        }
    }
}

/// Running orchestrator task.
pub struct OrchestratorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Signal the loop to stop and wait for it to exit.
    ///
    /// An in-flight dataset refresh completes first; pending pauses are cut
    /// short.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Update orchestrator task ended abnormally: {}", e);
        }
    }
}
