//! Inbound event operations: ingest, recent reads, anomaly lookup, status
//! updates. The transport fronting these (HTTP, queue, whatever) is out of
//! scope — this is the layer it calls.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use pulselens_cache::RecencyCache;
use pulselens_common::{Event, EventStatus, NewEvent, PulseError};
use pulselens_events::EventRepository;

pub struct EventService {
    events: Arc<dyn EventRepository>,
    cache: RecencyCache,
}

impl EventService {
    pub fn new(events: Arc<dyn EventRepository>, cache: RecencyCache) -> Self {
        Self { events, cache }
    }

    /// Persist a new event (store assigns id and defaults timestamp/status),
    /// then populate the recency cache best-effort. A cache failure is
    /// logged and never fails the ingest — the durable write already won.
    pub async fn ingest(&self, event: NewEvent) -> Result<Event, PulseError> {
        let saved = self.events.save(event).await.map_err(store_err)?;

        if let Err(e) = self.cache.put(&saved).await {
            warn!(event_id = %saved.id, error = %e, "Failed to cache event snapshot");
        }
        if let Err(e) = self.cache.push_recent(&saved).await {
            warn!(event_id = %saved.id, error = %e, "Failed to push event to recency list");
        }

        Ok(saved)
    }

    /// Events of the type from the last hour, newest first, at most `limit`.
    /// Served from the durable store; `RecencyCache::recent` is the
    /// cache-backed variant for callers that prefer speed over freshness.
    pub async fn recent_by_type(
        &self,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<Event>, PulseError> {
        let now = Utc::now();
        let events = self
            .events
            .find_by_type_and_timestamp_between(Some(event_type), now - Duration::hours(1), now)
            .await
            .map_err(store_err)?;

        Ok(events.into_iter().take(limit).collect())
    }

    /// Every persisted event whose numeric `value` is strictly greater than
    /// `threshold`.
    pub async fn find_anomalous(&self, threshold: f64) -> Result<Vec<Event>, PulseError> {
        self.events
            .find_by_value_greater_than(threshold)
            .await
            .map_err(store_err)
    }

    /// Overwrite the event's status. Any status may replace any other —
    /// transition legality is not this layer's concern. Returns None for
    /// an unknown id.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: EventStatus,
    ) -> Result<Option<Event>, PulseError> {
        self.events
            .update_status(id, status)
            .await
            .map_err(store_err)
    }
}

fn store_err(e: anyhow::Error) -> PulseError {
    PulseError::Store(e.to_string())
}
