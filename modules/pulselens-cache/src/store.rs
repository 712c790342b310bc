//! The cache-store contract and its in-process implementation.
//!
//! The surface mirrors what the recency layer actually consumes from a
//! Redis-shaped store: key/value with TTL, list push/trim/range, prefix
//! scan, delete, expire. Everything above it is written against the trait.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Write a value under `key` with the given TTL, overwriting any
    /// existing entry.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Read a value. Absent and expired are both `None`, never an error.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Remove a key. Returns whether a live entry was actually removed —
    /// deleting an absent or already-expired key is a successful no-op.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Keys matching a `prefix*` pattern.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Prepend to the list at `key`, creating it (with no TTL) if absent.
    /// Returns the list length after the push.
    async fn list_push_front(&self, key: &str, value: Value) -> Result<usize>;

    /// Keep only the inclusive index range [start, stop] of the list.
    async fn list_trim(&self, key: &str, start: usize, stop: usize) -> Result<()>;

    /// The inclusive index range [start, stop] of the list, front first.
    async fn list_range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Value>>;

    /// Reset the key's TTL. No-op for an absent key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}

enum Entry {
    Value {
        value: Value,
        expires_at: Option<Instant>,
    },
    List {
        items: VecDeque<Value>,
        expires_at: Option<Instant>,
    },
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        let expires_at = match self {
            Entry::Value { expires_at, .. } | Entry::List { expires_at, .. } => expires_at,
        };
        expires_at.map_or(false, |at| at <= now)
    }

    fn set_expiry(&mut self, at: Instant) {
        match self {
            Entry::Value { expires_at, .. } | Entry::List { expires_at, .. } => {
                *expires_at = Some(at)
            }
        }
    }
}

/// In-process cache store. Expiry is lazy: entries past their TTL read as
/// absent and are dropped on the access that notices them.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Drop the entry under `key` if its TTL has passed. Caller holds the lock.
fn purge_if_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    let now = Instant::now();
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            Entry::Value {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        match entries.get(key) {
            Some(Entry::Value { value, .. }) => Ok(Some(value.clone())),
            Some(Entry::List { .. }) => bail!("cache key `{key}` holds a list, not a value"),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        Ok(entries.remove(key).is_some())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let Some(prefix) = pattern.strip_suffix('*') else {
            bail!("cache scan only supports `prefix*` patterns, got `{pattern}`");
        };
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_push_front(&self, key: &str, value: Value) -> Result<usize> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert(Entry::List {
            items: VecDeque::new(),
            expires_at: None,
        });
        match entry {
            Entry::List { items, .. } => {
                items.push_front(value);
                Ok(items.len())
            }
            Entry::Value { .. } => bail!("cache key `{key}` holds a value, not a list"),
        }
    }

    async fn list_trim(&self, key: &str, start: usize, stop: usize) -> Result<()> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        if let Some(Entry::List { items, .. }) = entries.get_mut(key) {
            let kept: VecDeque<Value> = items
                .iter()
                .skip(start)
                .take(stop.saturating_sub(start) + 1)
                .cloned()
                .collect();
            *items = kept;
        }
        Ok(())
    }

    async fn list_range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<Value>> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        match entries.get(key) {
            Some(Entry::List { items, .. }) => Ok(items
                .iter()
                .skip(start)
                .take(stop.saturating_sub(start) + 1)
                .cloned()
                .collect()),
            Some(Entry::Value { .. }) => bail!("cache key `{key}` holds a value, not a list"),
            None => Ok(Vec::new()),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock();
        purge_if_expired(&mut entries, key);
        if let Some(entry) = entries.get_mut(key) {
            entry.set_expiry(Instant::now() + ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scan_matches_prefix_only() {
        let cache = MemoryCache::new();
        cache
            .set("event:1", json!(1), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("event:2", json!(2), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("other:1", json!(3), Duration::from_secs(60))
            .await
            .unwrap();

        let mut keys = cache.scan("event:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["event:1", "event:2"]);
    }

    #[tokio::test]
    async fn scan_rejects_non_prefix_patterns() {
        let cache = MemoryCache::new();
        assert!(cache.scan("event:?").await.is_err());
    }

    #[tokio::test]
    async fn trim_keeps_inclusive_range() {
        let cache = MemoryCache::new();
        for i in 0..5 {
            cache.list_push_front("l", json!(i)).await.unwrap();
        }
        // Front to back: 4 3 2 1 0
        cache.list_trim("l", 0, 2).await.unwrap();

        let range = cache.list_range("l", 0, 99).await.unwrap();
        assert_eq!(range, vec![json!(4), json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn mismatched_kinds_error() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!(1), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.list_push_front("k", json!(2)).await.is_err());

        cache.list_push_front("l", json!(1)).await.unwrap();
        assert!(cache.get("l").await.is_err());
    }

    #[tokio::test]
    async fn expire_resets_ttl_and_skips_absent_keys() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!(1), Duration::from_millis(30))
            .await
            .unwrap();
        cache.expire("k", Duration::from_secs(60)).await.unwrap();
        cache.expire("missing", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));
    }
}
