//! Sync coordinator: the single scheduled report/reconcile loop.
//!
//! Each tick runs one full cycle before the next tick is awaited, so cycles
//! never overlap; ticks that come due while a cycle is running are skipped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::desire::DesireClient;
use super::reconciler::{ChangeSet, ReconcileOutcome, Reconciler};
use super::report::ReportClient;
use super::transport::SyncTransport;
use super::SyncError;
use crate::status::{now, StatusSource};
use crate::store::SharedStore;

/// Cycle bookkeeping, readable while the loop runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    pub cycles: u64,
    pub failures: u64,
    pub last_attempt_at: Option<u64>,
    pub last_success_at: Option<u64>,
    pub last_error: Option<String>,
    /// Resources changed by the last successful cycle
    pub last_changed: usize,
}

pub struct SyncCoordinator {
    report: ReportClient,
    reconciler: Reconciler,
    source: Arc<dyn StatusSource>,
    interval: Duration,
    shutdown_grace: Duration,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncCoordinator {
    pub fn new(
        transport: Arc<dyn SyncTransport>,
        store: SharedStore,
        source: Arc<dyn StatusSource>,
        changes: mpsc::Sender<ChangeSet>,
        interval: Duration,
        shutdown_grace: Duration,
    ) -> Self {
        let desire = DesireClient::new(transport.clone(), store.clone());
        Self {
            report: ReportClient::new(transport),
            reconciler: Reconciler::new(store, desire, changes),
            source,
            interval,
            shutdown_grace,
            status: Arc::new(RwLock::new(SyncStatus::default())),
        }
    }

    /// Shared handle to the cycle status
    pub fn status(&self) -> Arc<RwLock<SyncStatus>> {
        self.status.clone()
    }

    /// One report → reconcile pass.
    ///
    /// The delta reconciled is always the one this report returned.
    pub async fn run_once(&self) -> Result<ReconcileOutcome, SyncError> {
        let info = self.source.forward_info().await;
        let backward = self.report.report(&info).await?;
        self.reconciler.reconcile(&backward).await
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    ///
    /// Shutdown interrupts the wait between cycles immediately. A cycle in
    /// flight gets `shutdown_grace` to finish and is then abandoned.
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.status.write().await.running = true;
        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Sync coordinator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => {
                    info!("Sync coordinator shutting down");
                    break;
                }
            }

            let cycle = self.cycle();
            tokio::pin!(cycle);

            tokio::select! {
                _ = &mut cycle => {}
                _ = shutdown.recv() => {
                    info!(
                        grace_ms = self.shutdown_grace.as_millis() as u64,
                        "Shutdown requested during sync cycle, waiting for it to finish"
                    );
                    if tokio::time::timeout(self.shutdown_grace, &mut cycle).await.is_err() {
                        warn!("Sync cycle did not finish in time, abandoning it");
                    }
                    break;
                }
            }
        }

        self.status.write().await.running = false;
        info!("Sync coordinator stopped");
    }

    async fn cycle(&self) {
        let span = info_span!("sync_cycle", cycle_id = %Uuid::new_v4());
        async {
            let started = now();
            let result = self.run_once().await;

            let mut status = self.status.write().await;
            status.cycles += 1;
            status.last_attempt_at = Some(started);

            match result {
                Ok(outcome) => {
                    status.last_success_at = Some(started);
                    status.last_error = None;
                    status.last_changed = outcome.applied.changed.len();
                    debug!(
                        desired = outcome.desired,
                        requested = outcome.requested,
                        changed = outcome.applied.changed.len(),
                        rejected = outcome.applied.rejected,
                        "Sync cycle complete"
                    );
                }
                Err(e) => {
                    status.failures += 1;
                    status.last_error = Some(e.to_string());
                    warn!(error = %e, "Sync cycle failed");
                }
            }
        }
        .instrument(span)
        .await
    }
}
