//! Durable stores for events and their hourly rollups, backed by Postgres.
//!
//! The analytics layer consumes the `EventRepository`/`RollupRepository`
//! traits, never the concrete stores — swap in the in-memory doubles
//! (feature `test-utils`) for deterministic tests with no database.

pub mod migrate;
pub mod pg;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use migrate::migrate;
pub use pg::{PgEventStore, PgRollupStore};
pub use traits::{EventRepository, RollupRepository};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryEventStore, MemoryRollupStore};
