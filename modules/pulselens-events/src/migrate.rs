//! Schema migrations, run by the server binary at startup. Idempotent.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id             UUID         PRIMARY KEY,
            event_type     TEXT         NOT NULL,
            source         TEXT         NOT NULL,
            user_id        TEXT,
            ts             TIMESTAMPTZ  NOT NULL,
            payload        JSONB        NOT NULL,
            correlation_id TEXT,
            status         TEXT         NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_ts ON events (ts DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_type_ts ON events (event_type, ts DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_source_status ON events (source, status)")
        .execute(pool)
        .await?;

    // Expression index serving the anomaly threshold scan.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_events_payload_value
        ON events (((payload->>'value')::double precision))
        WHERE jsonb_typeof(payload->'value') = 'number'
        "#,
    )
    .execute(pool)
    .await?;

    // The (event_type, period_start) primary key is what makes duplicate
    // window runs converge: see RollupRepository::upsert.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event_rollups (
            event_type         TEXT         NOT NULL,
            period_start       TIMESTAMPTZ  NOT NULL,
            period_end         TIMESTAMPTZ  NOT NULL,
            count              BIGINT       NOT NULL,
            count_by_source    JSONB        NOT NULL,
            averages_by_metric JSONB        NOT NULL,
            additional_metrics JSONB        NOT NULL,
            PRIMARY KEY (event_type, period_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Schema migrations applied");
    Ok(())
}
