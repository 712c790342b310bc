use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pulselens_analytics::{BucketAggregator, RollupScheduler};
use pulselens_cache::{CacheStore, CacheSweeper, MemoryCache};
use pulselens_common::Config;
use pulselens_events::{migrate, PgEventStore, PgRollupStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulselens=info".parse()?))
        .init();

    info!("PulseLens starting...");

    // Load config
    let config = Config::from_env();

    // Connect to Postgres
    let pool = PgPool::connect(&config.database_url).await?;

    // Run migrations
    migrate(&pool).await?;

    let event_store = Arc::new(PgEventStore::new(pool.clone()));
    let rollup_store = Arc::new(PgRollupStore::new(pool));
    let cache_store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());

    // The rollup scheduler lives for the whole process: started here,
    // stopped at shutdown. There is no runtime enable/disable.
    let aggregator = Arc::new(BucketAggregator::new(event_store, rollup_store));
    let scheduler = RollupScheduler::new(
        aggregator,
        Duration::from_secs(config.aggregation_interval_secs),
    );
    let scheduler_handle = scheduler.start();
    info!(
        interval_secs = config.aggregation_interval_secs,
        "Rollup scheduler started"
    );

    let sweep_task = spawn_sweep_loop(
        CacheSweeper::new(cache_store),
        Duration::from_secs(config.sweep_interval_secs),
        config.sweep_max_age_hours,
    );
    info!(
        interval_secs = config.sweep_interval_secs,
        max_age_hours = config.sweep_max_age_hours,
        "Cache sweep loop started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    sweep_task.abort();
    scheduler_handle.shutdown().await;

    Ok(())
}

/// Run the cache sweeper on a timer. A failed sweep is logged and retried
/// at the next tick.
fn spawn_sweep_loop(
    sweeper: CacheSweeper,
    interval: Duration,
    max_age_hours: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
            if let Err(e) = sweeper.sweep(cutoff).await {
                error!(error = %e, "Cache sweep failed");
            }
        }
    })
}
