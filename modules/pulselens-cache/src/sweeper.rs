//! Proactive reclamation of logically stale individual-event entries.
//!
//! The native 30-minute TTL already bounds staleness; the sweeper exists to
//! reclaim memory for entries policy considers long dead (default: a day
//! old) without waiting on the store's own eviction.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use pulselens_common::Event;

use crate::recency::event_key_pattern;
use crate::store::CacheStore;

/// Keys examined per batch, bounding memory and in-flight call volume.
pub const SWEEP_BATCH: usize = 100;

pub struct CacheSweeper {
    store: Arc<dyn CacheStore>,
}

impl CacheSweeper {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Delete every individual-event entry whose event timestamp is older
    /// than `cutoff`. Returns the number of entries deleted.
    ///
    /// Not transactional: a key may expire or be deleted by a concurrent
    /// sweep between the scan and the delete — that is a successful no-op.
    pub async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let keys = self.store.scan(&event_key_pattern()).await?;
        let scanned = keys.len();

        let mut deleted = 0u64;
        for batch in keys.chunks(SWEEP_BATCH) {
            let results = join_all(batch.iter().map(|key| self.sweep_key(key, cutoff))).await;
            for outcome in results {
                if outcome? {
                    deleted += 1;
                }
            }
        }

        info!(scanned, deleted, cutoff = %cutoff, "Cache sweep complete");
        Ok(deleted)
    }

    /// Returns whether this key's entry was deleted.
    async fn sweep_key(&self, key: &str, cutoff: DateTime<Utc>) -> Result<bool> {
        let Some(value) = self.store.get(key).await? else {
            // Gone since the scan — native TTL or a concurrent sweep won.
            return Ok(false);
        };

        let event: Event = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                warn!(key, error = %e, "Unreadable cache entry, skipping");
                return Ok(false);
            }
        };

        if event.ts >= cutoff {
            return Ok(false);
        }

        self.store.delete(key).await
    }
}
