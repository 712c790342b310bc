//! Recency cache: bounded per-type lists of recent events plus individual
//! event snapshots, both TTL-bound, over a generic cache-store contract.
//!
//! Soft state only. Loss or staleness never corrupts the durable record;
//! callers needing resilience fall back to the event store themselves.

pub mod recency;
pub mod store;
pub mod sweeper;

pub use recency::{RecencyCache, EVENT_TTL, RECENT_LIST_CAP, RECENT_LIST_TTL};
pub use store::{CacheStore, MemoryCache};
pub use sweeper::{CacheSweeper, SWEEP_BATCH};
