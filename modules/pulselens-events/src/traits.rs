// Trait boundaries between the analytics core and the durable stores.
//
// The core never names a concrete store: the aggregator, scheduler, and
// service layer take Arc<dyn EventRepository> / Arc<dyn RollupRepository>.
// Production wires the Postgres stores; tests wire the in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pulselens_common::{Event, EventStatus, NewEvent, Rollup};

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persist a new event. The store assigns the id; a missing timestamp
    /// defaults to now and a missing status to `received`. The timestamp is
    /// set exactly once here and never rewritten.
    async fn save(&self, event: NewEvent) -> Result<Event>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Events with ts in the half-open window [start, end), newest first.
    /// `event_type` of None matches all types — the aggregator fetches the
    /// whole window once and groups in memory.
    async fn find_by_type_and_timestamp_between(
        &self,
        event_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    /// Events whose numeric `value` payload field is strictly greater than
    /// `threshold`. Non-numeric and absent values never match.
    async fn find_by_value_greater_than(&self, threshold: f64) -> Result<Vec<Event>>;

    /// Events from one source in one status, newest first.
    async fn find_by_source_and_status(
        &self,
        source: &str,
        status: EventStatus,
    ) -> Result<Vec<Event>>;

    async fn count(&self) -> Result<i64>;

    /// Full scan, newest first. Used by the report path for type enumeration.
    async fn find_all(&self) -> Result<Vec<Event>>;

    /// Overwrite the event's status, leaving everything else (the timestamp
    /// in particular) untouched. Returns None for an unknown id.
    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>>;
}

#[async_trait]
pub trait RollupRepository: Send + Sync {
    /// Insert the rollup, or overwrite the existing record for the same
    /// (event_type, period_start). Duplicate runs of one window — a slow
    /// tick lapped by the next, or another replica — converge to a single
    /// record instead of double-counting.
    async fn upsert(&self, rollup: Rollup) -> Result<Rollup>;

    /// Rollups for one type whose period start is at or after `start`,
    /// oldest first.
    async fn find_by_type_and_period_start_at_or_after(
        &self,
        event_type: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<Rollup>>;
}
