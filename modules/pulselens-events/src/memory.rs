// In-memory repository doubles matching the two trait boundaries.
//
// Stateful Vec-behind-Mutex stores: no network, no database, deterministic.
// MemoryRollupStore supports per-type failure injection (`.fail_on()`) so
// tests can exercise partition failure isolation in the aggregator.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pulselens_common::{Event, EventStatus, NewEvent, Rollup};

use crate::traits::{EventRepository, RollupRepository};

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored event, insertion order.
    pub fn all(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

fn newest_first(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| b.ts.cmp(&a.ts));
    events
}

#[async_trait]
impl EventRepository for MemoryEventStore {
    async fn save(&self, event: NewEvent) -> Result<Event> {
        let stored = Event {
            id: Uuid::new_v4(),
            event_type: event.event_type,
            source: event.source,
            user_id: event.user_id,
            ts: event.ts.unwrap_or_else(Utc::now),
            payload: event.payload,
            correlation_id: event.correlation_id,
            status: event.status.unwrap_or(EventStatus::Received),
        };
        self.events.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn find_by_type_and_timestamp_between(
        &self,
        event_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| e.ts >= start && e.ts < end)
            .cloned()
            .collect();
        Ok(newest_first(matches))
    }

    async fn find_by_value_greater_than(&self, threshold: f64) -> Result<Vec<Event>> {
        let matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.numeric_value().is_some_and(|v| v > threshold))
            .cloned()
            .collect();
        Ok(newest_first(matches))
    }

    async fn find_by_source_and_status(
        &self,
        source: &str,
        status: EventStatus,
    ) -> Result<Vec<Event>> {
        let matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.source == source && e.status == status)
            .cloned()
            .collect();
        Ok(newest_first(matches))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.events.lock().unwrap().len() as i64)
    }

    async fn find_all(&self) -> Result<Vec<Event>> {
        Ok(newest_first(self.events.lock().unwrap().clone()))
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>> {
        let mut events = self.events.lock().unwrap();
        match events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.status = status;
                Ok(Some(event.clone()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryRollupStore {
    rollups: Mutex<Vec<Rollup>>,
    fail_types: HashSet<String>,
}

impl MemoryRollupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert for this event type fail, simulating a transient
    /// store error scoped to one partition.
    pub fn fail_on(mut self, event_type: &str) -> Self {
        self.fail_types.insert(event_type.to_string());
        self
    }

    /// Snapshot of every stored rollup, insertion order.
    pub fn all(&self) -> Vec<Rollup> {
        self.rollups.lock().unwrap().clone()
    }
}

#[async_trait]
impl RollupRepository for MemoryRollupStore {
    async fn upsert(&self, rollup: Rollup) -> Result<Rollup> {
        if self.fail_types.contains(&rollup.event_type) {
            bail!("injected store failure for type `{}`", rollup.event_type);
        }

        let mut rollups = self.rollups.lock().unwrap();
        match rollups
            .iter_mut()
            .find(|r| r.event_type == rollup.event_type && r.period_start == rollup.period_start)
        {
            Some(existing) => *existing = rollup.clone(),
            None => rollups.push(rollup.clone()),
        }
        Ok(rollup)
    }

    async fn find_by_type_and_period_start_at_or_after(
        &self,
        event_type: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<Rollup>> {
        let mut matches: Vec<Rollup> = self
            .rollups
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.event_type == event_type && r.period_start >= start)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.period_start.cmp(&b.period_start));
        Ok(matches)
    }
}
