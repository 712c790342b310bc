//! Postgres implementations of the store traits.
//!
//! Events live in `events` (JSONB payload), rollups in `event_rollups` with
//! a primary key on (event_type, period_start) backing the upsert.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use pulselens_common::{Event, EventStatus, NewEvent, Rollup};

use crate::traits::{EventRepository, RollupRepository};

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventStore {
    async fn save(&self, event: NewEvent) -> Result<Event> {
        let id = Uuid::new_v4();
        let ts = event.ts.unwrap_or_else(Utc::now);
        let status = event.status.unwrap_or(EventStatus::Received);

        let row = sqlx::query(
            r#"
            INSERT INTO events (id, event_type, source, user_id, ts, payload, correlation_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, event_type, source, user_id, ts, payload, correlation_id, status
            "#,
        )
        .bind(id)
        .bind(&event.event_type)
        .bind(&event.source)
        .bind(&event.user_id)
        .bind(ts)
        .bind(&event.payload)
        .bind(&event.correlation_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        event_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query(
            r#"
            SELECT id, event_type, source, user_id, ts, payload, correlation_id, status
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    async fn find_by_type_and_timestamp_between(
        &self,
        event_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, source, user_id, ts, payload, correlation_id, status
            FROM events
            WHERE ($1::text IS NULL OR event_type = $1)
              AND ts >= $2 AND ts < $3
            ORDER BY ts DESC
            "#,
        )
        .bind(event_type)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn find_by_value_greater_than(&self, threshold: f64) -> Result<Vec<Event>> {
        // jsonb_typeof guard: events whose `value` is a string (or missing)
        // are not anomalies, and must not break the cast.
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, source, user_id, ts, payload, correlation_id, status
            FROM events
            WHERE jsonb_typeof(payload->'value') = 'number'
              AND (payload->>'value')::double precision > $1
            ORDER BY ts DESC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn find_by_source_and_status(
        &self,
        source: &str,
        status: EventStatus,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, source, user_id, ts, payload, correlation_id, status
            FROM events
            WHERE source = $1 AND status = $2
            ORDER BY ts DESC
            "#,
        )
        .bind(source)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("n")?)
    }

    async fn find_all(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, source, user_id, ts, payload, correlation_id, status
            FROM events
            ORDER BY ts DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>> {
        let row = sqlx::query(
            r#"
            UPDATE events SET status = $2
            WHERE id = $1
            RETURNING id, event_type, source, user_id, ts, payload, correlation_id, status
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(event_from_row).transpose()
    }
}

#[derive(Clone)]
pub struct PgRollupStore {
    pool: PgPool,
}

impl PgRollupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RollupRepository for PgRollupStore {
    async fn upsert(&self, rollup: Rollup) -> Result<Rollup> {
        let row = sqlx::query(
            r#"
            INSERT INTO event_rollups
                (event_type, period_start, period_end, count, count_by_source, averages_by_metric, additional_metrics)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_type, period_start) DO UPDATE SET
                period_end = EXCLUDED.period_end,
                count = EXCLUDED.count,
                count_by_source = EXCLUDED.count_by_source,
                averages_by_metric = EXCLUDED.averages_by_metric,
                additional_metrics = EXCLUDED.additional_metrics
            RETURNING event_type, period_start, period_end, count, count_by_source, averages_by_metric, additional_metrics
            "#,
        )
        .bind(&rollup.event_type)
        .bind(rollup.period_start)
        .bind(rollup.period_end)
        .bind(rollup.count)
        .bind(serde_json::to_value(&rollup.count_by_source)?)
        .bind(serde_json::to_value(&rollup.averages_by_metric)?)
        .bind(&rollup.additional_metrics)
        .fetch_one(&self.pool)
        .await?;

        rollup_from_row(&row)
    }

    async fn find_by_type_and_period_start_at_or_after(
        &self,
        event_type: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<Rollup>> {
        let rows = sqlx::query(
            r#"
            SELECT event_type, period_start, period_end, count, count_by_source, averages_by_metric, additional_metrics
            FROM event_rollups
            WHERE event_type = $1 AND period_start >= $2
            ORDER BY period_start ASC
            "#,
        )
        .bind(event_type)
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(rollup_from_row).collect()
    }
}

fn event_from_row(row: &PgRow) -> Result<Event> {
    let status_raw: String = row.try_get("status")?;
    let status = EventStatus::parse(&status_raw)
        .ok_or_else(|| anyhow!("unknown event status `{status_raw}` in events row"))?;

    Ok(Event {
        id: row.try_get("id")?,
        event_type: row.try_get("event_type")?,
        source: row.try_get("source")?,
        user_id: row.try_get("user_id")?,
        ts: row.try_get("ts")?,
        payload: row.try_get("payload")?,
        correlation_id: row.try_get("correlation_id")?,
        status,
    })
}

fn rollup_from_row(row: &PgRow) -> Result<Rollup> {
    let count_by_source: serde_json::Value = row.try_get("count_by_source")?;
    let averages_by_metric: serde_json::Value = row.try_get("averages_by_metric")?;

    Ok(Rollup {
        event_type: row.try_get("event_type")?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        count: row.try_get("count")?,
        count_by_source: serde_json::from_value(count_by_source)?,
        averages_by_metric: serde_json::from_value(averages_by_metric)?,
        additional_metrics: row.try_get("additional_metrics")?,
    })
}
