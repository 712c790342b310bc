//! One aggregation pass: fetch a window, fold it into rollups, persist
//! each partition independently.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{error, info};

use pulselens_common::HourWindow;
use pulselens_events::{EventRepository, RollupRepository};

use crate::rollup::roll_up_window;

/// What one pass over one window did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationOutcome {
    pub events_seen: usize,
    pub rollups_written: usize,
    pub partitions_failed: usize,
}

pub struct BucketAggregator {
    events: Arc<dyn EventRepository>,
    rollups: Arc<dyn RollupRepository>,
}

impl BucketAggregator {
    pub fn new(events: Arc<dyn EventRepository>, rollups: Arc<dyn RollupRepository>) -> Self {
        Self { events, rollups }
    }

    /// Aggregate one half-open window. The window fetch is unfiltered by
    /// type; grouping happens in memory over the single scan.
    ///
    /// A failure persisting one type's rollup is logged and does not stop
    /// the other partitions. A failure fetching the window aborts the pass.
    pub async fn aggregate_window(&self, window: HourWindow) -> Result<AggregationOutcome> {
        let events = self
            .events
            .find_by_type_and_timestamp_between(None, window.start, window.end)
            .await?;

        let rollups = roll_up_window(&events, window);
        let partitions = rollups.len();

        let persisted = join_all(rollups.into_iter().map(|rollup| {
            let store = self.rollups.clone();
            async move {
                let event_type = rollup.event_type.clone();
                match store.upsert(rollup).await {
                    Ok(_) => true,
                    Err(e) => {
                        error!(event_type, error = %e, "Failed to persist rollup partition");
                        false
                    }
                }
            }
        }))
        .await;

        let rollups_written = persisted.iter().filter(|ok| **ok).count();
        let outcome = AggregationOutcome {
            events_seen: events.len(),
            rollups_written,
            partitions_failed: partitions - rollups_written,
        };

        info!(
            window = %window,
            events = outcome.events_seen,
            written = outcome.rollups_written,
            failed = outcome.partitions_failed,
            "Aggregation pass complete"
        );

        Ok(outcome)
    }
}
