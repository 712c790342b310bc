//! The process-wide periodic trigger for hourly rollups.
//!
//! Every tick targets the most recently closed full hour and hands it to
//! the aggregator on a detached task, so a slow store never stalls the
//! timer. A compare-and-swap guard skips ticks that would overlap an
//! in-flight run; duplicate windows across replicas converge in the store
//! via upsert rather than a lock here.
//!
//! The spawned loop is observable: every tick reports an outcome on a
//! channel the handle exposes. Production wiring ignores it; tests await it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use pulselens_common::HourWindow;

use crate::aggregator::{AggregationOutcome, BucketAggregator};

/// What one scheduler tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed {
        window: HourWindow,
        outcome: AggregationOutcome,
    },
    /// The previous run was still in flight when the timer fired.
    SkippedOverlap { window: HourWindow },
    /// The window fetch failed; per-partition failures are not this — they
    /// land in `Completed { outcome.partitions_failed }`.
    Failed { window: HourWindow, error: String },
}

pub struct RollupScheduler {
    aggregator: Arc<BucketAggregator>,
    interval: Duration,
}

impl RollupScheduler {
    pub fn new(aggregator: Arc<BucketAggregator>, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
        }
    }

    /// Spawn the periodic loop. The first tick fires immediately.
    pub fn start(self) -> SchedulerHandle {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(false));

        let loop_shutdown = shutdown.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = loop_shutdown.notified() => break,
                    _ = ticker.tick() => {
                        let window = HourWindow::previous_full_hour(Utc::now());

                        if running
                            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                            .is_err()
                        {
                            warn!(window = %window, "Previous aggregation still in flight, skipping tick");
                            let _ = outcome_tx.send(TickOutcome::SkippedOverlap { window });
                            continue;
                        }

                        // Detach the pass so the timer keeps its cadence.
                        let aggregator = self.aggregator.clone();
                        let running = running.clone();
                        let outcome_tx = outcome_tx.clone();
                        tokio::spawn(async move {
                            let result = aggregator.aggregate_window(window).await;
                            running.store(false, Ordering::SeqCst);

                            match result {
                                Ok(outcome) => {
                                    let _ = outcome_tx
                                        .send(TickOutcome::Completed { window, outcome });
                                }
                                Err(e) => {
                                    error!(window = %window, error = %e, "Aggregation pass failed");
                                    let _ = outcome_tx.send(TickOutcome::Failed {
                                        window,
                                        error: e.to_string(),
                                    });
                                }
                            }
                        });
                    }
                }
            }
            info!("Rollup scheduler stopped");
        });

        SchedulerHandle {
            shutdown,
            task,
            outcomes: outcome_rx,
        }
    }
}

/// Live handle to the spawned scheduler loop.
pub struct SchedulerHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
    outcomes: mpsc::UnboundedReceiver<TickOutcome>,
}

impl SchedulerHandle {
    /// The next tick's outcome. Production callers never need this; an
    /// in-flight pass at shutdown may leave its outcome undelivered.
    pub async fn next_outcome(&mut self) -> Option<TickOutcome> {
        self.outcomes.recv().await
    }

    /// Stop the timer loop and wait for it to exit. A pass already in
    /// flight finishes on its own detached task.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}
