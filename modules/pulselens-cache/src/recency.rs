//! Bounded, TTL-bound views of recent events.
//!
//! Keyspace: `event:<id>` for individual snapshots, `recent:<type>` for the
//! per-type lists. Push, trim, and TTL refresh are three separate store
//! calls — a concurrent reader can transiently observe an over-cap list or
//! a not-yet-refreshed TTL. Accepted: this is an accelerator, not truth.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use pulselens_common::Event;

use crate::store::CacheStore;

/// TTL for individual event snapshots.
pub const EVENT_TTL: Duration = Duration::from_secs(30 * 60);
/// TTL for per-type recency lists, refreshed on every push.
pub const RECENT_LIST_TTL: Duration = Duration::from_secs(6 * 60 * 60);
/// Cap on the logical length of a recency list.
pub const RECENT_LIST_CAP: usize = 100;

const EVENT_KEY_PREFIX: &str = "event:";
const RECENT_KEY_PREFIX: &str = "recent:";

#[derive(Clone)]
pub struct RecencyCache {
    store: Arc<dyn CacheStore>,
}

impl RecencyCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Cache an individual event snapshot under its id, overwriting any
    /// existing entry.
    pub async fn put(&self, event: &Event) -> Result<()> {
        let key = event_key(event.id);
        self.store
            .set(&key, serde_json::to_value(event)?, EVENT_TTL)
            .await
    }

    /// The cached event, or None. Absence is not an error.
    pub async fn get(&self, id: Uuid) -> Result<Option<Event>> {
        match self.store.get(&event_key(id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Prepend the event to its type's recency list, trim past the cap,
    /// and refresh the list TTL (refreshed on every push, trim or not).
    pub async fn push_recent(&self, event: &Event) -> Result<()> {
        let key = recent_key(&event.event_type);
        let len = self
            .store
            .list_push_front(&key, serde_json::to_value(event)?)
            .await?;

        if len > RECENT_LIST_CAP {
            self.store.list_trim(&key, 0, RECENT_LIST_CAP - 1).await?;
        }

        self.store.expire(&key, RECENT_LIST_TTL).await
    }

    /// Up to `limit` most recent events of the type, newest first.
    pub async fn recent(&self, event_type: &str, limit: usize) -> Result<Vec<Event>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let values = self
            .store
            .list_range(&recent_key(event_type), 0, limit - 1)
            .await?;

        values
            .into_iter()
            .map(|v: Value| Ok(serde_json::from_value(v)?))
            .collect()
    }
}

pub(crate) fn event_key(id: Uuid) -> String {
    format!("{EVENT_KEY_PREFIX}{id}")
}

fn recent_key(event_type: &str) -> String {
    format!("{RECENT_KEY_PREFIX}{event_type}")
}

pub(crate) fn event_key_pattern() -> String {
    format!("{EVENT_KEY_PREFIX}*")
}
