//! AnalyticsService behavior: rollup reads, validation, trend lines, and
//! the combined report's type cap.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use pulselens_analytics::AnalyticsService;
use pulselens_common::{NewEvent, PulseError, Rollup};
use pulselens_events::{
    EventRepository, MemoryEventStore, MemoryRollupStore, RollupRepository,
};

fn analytics(max_report_types: usize) -> (
    Arc<MemoryEventStore>,
    Arc<MemoryRollupStore>,
    AnalyticsService,
) {
    let events = Arc::new(MemoryEventStore::new());
    let rollups = Arc::new(MemoryRollupStore::new());
    let service = AnalyticsService::new(events.clone(), rollups.clone(), max_report_types);
    (events, rollups, service)
}

fn rollup(event_type: &str, hours_ago: i64) -> Rollup {
    let start = Utc::now() - Duration::hours(hours_ago);
    Rollup {
        event_type: event_type.to_string(),
        period_start: start,
        period_end: start + Duration::hours(1),
        count: 1,
        count_by_source: [("web".to_string(), 1)].into_iter().collect(),
        averages_by_metric: Default::default(),
        additional_metrics: json!({}),
    }
}

#[tokio::test]
async fn blank_type_is_rejected_before_any_io() {
    let (_, _, service) = analytics(5);

    for bad in ["", "   "] {
        let err = service.analytics_for_period(bad, 24).await.unwrap_err();
        assert!(matches!(err, PulseError::Validation(_)), "got {err:?}");

        let err = service.daily_trends(bad, 7).await.unwrap_err();
        assert!(matches!(err, PulseError::Validation(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn analytics_for_period_honors_the_trailing_window() {
    let (_, rollups, service) = analytics(5);

    rollups.upsert(rollup("click", 2)).await.unwrap();
    rollups.upsert(rollup("click", 50)).await.unwrap();
    rollups.upsert(rollup("login", 2)).await.unwrap();

    let found = service.analytics_for_period("click", 24).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_type, "click");
}

#[tokio::test]
async fn summary_by_type_folds_the_window() {
    let (events, _, service) = analytics(5);

    let now = Utc::now();
    for (t, s, v) in [("click", "web", 5.0), ("click", "app", 15.0), ("login", "app", 1.0)] {
        events
            .save(
                NewEvent::new(t, s, json!({"value": v}))
                    .with_ts(now - Duration::minutes(10)),
            )
            .await
            .unwrap();
    }

    let summaries = service
        .summary_by_type(now - Duration::hours(1), now)
        .await
        .unwrap();

    assert_eq!(summaries.len(), 2);
    let click = summaries.iter().find(|s| s.event_type == "click").unwrap();
    assert_eq!(click.count, 2);
    assert_eq!(click.average_value, Some(10.0));
    assert_eq!(click.total_value, Some(20.0));
}

#[tokio::test]
async fn daily_trends_ascend_by_day() {
    let (events, _, service) = analytics(5);

    let now = Utc::now();
    for days_ago in [3, 1, 3, 2] {
        events
            .save(
                NewEvent::new("click", "web", json!({"value": days_ago}))
                    .with_ts(now - Duration::days(days_ago)),
            )
            .await
            .unwrap();
    }

    let trends = service.daily_trends("click", 7).await.unwrap();
    assert_eq!(trends.len(), 3);
    assert!(trends.windows(2).all(|w| w[0].day < w[1].day));
    assert_eq!(trends[0].count, 2); // the two three-days-ago events
}

#[tokio::test]
async fn complete_report_caps_trend_types_at_the_configured_fan_out() {
    let (events, _, service) = analytics(3);

    let now = Utc::now();
    for n in 0..7 {
        events
            .save(
                NewEvent::new(format!("type-{n}"), "web", json!({"value": n}))
                    .with_ts(now - Duration::hours(n)),
            )
            .await
            .unwrap();
    }

    let report = service.complete_report(7).await.unwrap();

    assert_eq!(report.total_events, 7);
    assert_eq!(report.period.duration_days, 7);
    assert_eq!(report.events_by_type.len(), 7); // summaries are uncapped
    assert_eq!(report.trends.len(), 3); // trends honor max_report_types

    for trend in &report.trends {
        assert_eq!(trend.daily.len(), 1);
    }
}

#[tokio::test]
async fn complete_report_on_an_empty_store_is_empty_not_an_error() {
    let (_, _, service) = analytics(5);

    let report = service.complete_report(7).await.unwrap();
    assert_eq!(report.total_events, 0);
    assert!(report.events_by_type.is_empty());
    assert!(report.trends.is_empty());
}
