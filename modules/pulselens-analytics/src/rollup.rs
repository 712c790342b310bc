//! Pure aggregation math. No I/O, no clocks — every function here folds a
//! slice of events into an immutable result, so the numbers are testable
//! in isolation from the stores.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use pulselens_common::{Event, HourWindow, Rollup, VALUE_FIELD};

/// Running fold over the numeric `value` field of a partition.
#[derive(Debug, Clone, Copy, Default)]
struct MetricFold {
    sum: f64,
    max: f64,
    n: u64,
}

impl MetricFold {
    fn observe(mut self, value: f64) -> Self {
        self.sum += value;
        self.max = if self.n == 0 { value } else { self.max.max(value) };
        self.n += 1;
        self
    }

    fn average(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// Roll one window's events into one rollup per distinct event type,
/// ordered by type. An empty window yields nothing — no zero-count records.
pub fn roll_up_window(events: &[Event], window: HourWindow) -> Vec<Rollup> {
    let mut partitions: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
    for event in events {
        partitions.entry(&event.event_type).or_default().push(event);
    }

    partitions
        .into_iter()
        .map(|(event_type, partition)| roll_up_partition(event_type, &partition, window))
        .collect()
}

fn roll_up_partition(event_type: &str, events: &[&Event], window: HourWindow) -> Rollup {
    let mut count_by_source: HashMap<String, i64> = HashMap::new();
    let mut metrics = MetricFold::default();

    for event in events {
        *count_by_source.entry(event.source.clone()).or_insert(0) += 1;
        // Events without a numeric value are counted, not measured.
        if let Some(value) = event.numeric_value() {
            metrics = metrics.observe(value);
        }
    }

    let mut averages_by_metric = HashMap::new();
    let additional_metrics = match metrics.average() {
        Some(average) => {
            averages_by_metric.insert(VALUE_FIELD.to_string(), average);
            json!({
                "value_sum": metrics.sum,
                "value_max": metrics.max,
                "measured_events": metrics.n,
            })
        }
        None => json!({}),
    };

    Rollup {
        event_type: event_type.to_string(),
        period_start: window.start,
        period_end: window.end,
        count: events.len() as i64,
        count_by_source,
        averages_by_metric,
        additional_metrics,
    }
}

/// Per-type summary over an arbitrary window: count, value totals, and the
/// timestamp of the newest event. One entry per type, ordered by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub event_type: String,
    pub count: i64,
    pub total_value: Option<f64>,
    pub average_value: Option<f64>,
    pub last_event_ts: DateTime<Utc>,
}

pub fn summarize(events: &[Event]) -> Vec<TypeSummary> {
    let mut partitions: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
    for event in events {
        partitions.entry(&event.event_type).or_default().push(event);
    }

    partitions
        .into_iter()
        .map(|(event_type, partition)| {
            let metrics = partition
                .iter()
                .filter_map(|e| e.numeric_value())
                .fold(MetricFold::default(), MetricFold::observe);

            let last_event_ts = partition
                .iter()
                .map(|e| e.ts)
                .max()
                .unwrap_or(DateTime::<Utc>::MIN_UTC); // partitions are never empty

            TypeSummary {
                event_type: event_type.to_string(),
                count: partition.len() as i64,
                total_value: (metrics.n > 0).then_some(metrics.sum),
                average_value: metrics.average(),
                last_event_ts,
            }
        })
        .collect()
}

/// One calendar day of a type's trend line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub day: NaiveDate,
    pub count: i64,
    pub average_value: Option<f64>,
    pub total_value: Option<f64>,
}

/// Bucket events by UTC calendar day, ascending. Caller has already
/// filtered to one event type and the trailing period of interest.
pub fn daily_trends(events: &[Event]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
    for event in events {
        days.entry(event.ts.date_naive()).or_default().push(event);
    }

    days.into_iter()
        .map(|(day, bucket)| {
            let metrics = bucket
                .iter()
                .filter_map(|e| e.numeric_value())
                .fold(MetricFold::default(), MetricFold::observe);

            DailyTrend {
                day,
                count: bucket.len() as i64,
                average_value: metrics.average(),
                total_value: (metrics.n > 0).then_some(metrics.sum),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pulselens_common::EventStatus;
    use serde_json::Value;
    use uuid::Uuid;

    fn window() -> HourWindow {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        HourWindow {
            start,
            end: start + Duration::hours(1),
        }
    }

    fn event(event_type: &str, source: &str, payload: Value, offset_mins: i64) -> Event {
        Event {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            user_id: None,
            ts: window().start + Duration::minutes(offset_mins),
            payload,
            correlation_id: None,
            status: EventStatus::Received,
        }
    }

    #[test]
    fn click_scenario_counts_sources_and_averages() {
        let events = vec![
            event("click", "web", json!({"value": 5}), 10),
            event("click", "app", json!({"value": 15}), 20),
        ];

        let rollups = roll_up_window(&events, window());
        assert_eq!(rollups.len(), 1);

        let r = &rollups[0];
        assert_eq!(r.event_type, "click");
        assert_eq!(r.count, 2);
        assert_eq!(r.count_by_source.get("web"), Some(&1));
        assert_eq!(r.count_by_source.get("app"), Some(&1));
        assert_eq!(r.averages_by_metric.get(VALUE_FIELD), Some(&10.0));
        assert_eq!(r.additional_metrics["value_sum"], json!(20.0));
        assert_eq!(r.additional_metrics["value_max"], json!(15.0));
    }

    #[test]
    fn count_always_equals_source_count_sum() {
        let events = vec![
            event("click", "web", json!({}), 1),
            event("click", "web", json!({}), 2),
            event("click", "app", json!({}), 3),
            event("login", "app", json!({}), 4),
        ];

        for rollup in roll_up_window(&events, window()) {
            let source_sum: i64 = rollup.count_by_source.values().sum();
            assert_eq!(rollup.count, source_sum);
            assert!(rollup.period_start < rollup.period_end);
        }
    }

    #[test]
    fn one_rollup_per_type_ordered() {
        let events = vec![
            event("login", "app", json!({}), 1),
            event("click", "web", json!({}), 2),
            event("purchase", "web", json!({}), 3),
            event("click", "web", json!({}), 4),
        ];

        let rollups = roll_up_window(&events, window());
        let types: Vec<&str> = rollups.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["click", "login", "purchase"]);
        assert_eq!(rollups[0].count, 2);
    }

    #[test]
    fn empty_window_emits_nothing() {
        assert!(roll_up_window(&[], window()).is_empty());
    }

    #[test]
    fn single_source_partition_still_gets_a_source_entry() {
        let events = vec![
            event("click", "web", json!({}), 1),
            event("click", "web", json!({}), 2),
        ];

        let rollups = roll_up_window(&events, window());
        assert_eq!(rollups[0].count_by_source.len(), 1);
        assert_eq!(rollups[0].count_by_source.get("web"), Some(&2));
    }

    #[test]
    fn events_without_a_numeric_value_are_counted_not_measured() {
        let events = vec![
            event("click", "web", json!({"value": 4.0}), 1),
            event("click", "web", json!({"value": "oops"}), 2),
            event("click", "web", json!({}), 3),
            event("click", "web", json!({"value": 8.0}), 4),
        ];

        let rollups = roll_up_window(&events, window());
        let r = &rollups[0];
        assert_eq!(r.count, 4);
        assert_eq!(r.averages_by_metric.get(VALUE_FIELD), Some(&6.0));
        assert_eq!(r.additional_metrics["measured_events"], json!(2));
    }

    #[test]
    fn partition_with_no_measurable_events_has_no_metric_entries() {
        let events = vec![event("click", "web", json!({"note": "hi"}), 1)];

        let rollups = roll_up_window(&events, window());
        assert!(rollups[0].averages_by_metric.is_empty());
        assert_eq!(rollups[0].additional_metrics, json!({}));
    }

    #[test]
    fn negative_values_fold_correctly_into_max() {
        let events = vec![
            event("reading", "sensor", json!({"value": -7.5}), 1),
            event("reading", "sensor", json!({"value": -2.5}), 2),
        ];

        let rollups = roll_up_window(&events, window());
        assert_eq!(rollups[0].additional_metrics["value_max"], json!(-2.5));
        assert_eq!(rollups[0].averages_by_metric.get(VALUE_FIELD), Some(&-5.0));
    }

    #[test]
    fn summary_reports_totals_and_last_event_time() {
        let events = vec![
            event("click", "web", json!({"value": 5}), 10),
            event("click", "app", json!({"value": 15}), 40),
            event("login", "app", json!({}), 20),
        ];

        let summaries = summarize(&events);
        assert_eq!(summaries.len(), 2);

        let click = &summaries[0];
        assert_eq!(click.event_type, "click");
        assert_eq!(click.count, 2);
        assert_eq!(click.total_value, Some(20.0));
        assert_eq!(click.average_value, Some(10.0));
        assert_eq!(click.last_event_ts, window().start + Duration::minutes(40));

        let login = &summaries[1];
        assert_eq!(login.total_value, None);
        assert_eq!(login.average_value, None);
    }

    #[test]
    fn trends_bucket_by_utc_day_ascending() {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let mut events = Vec::new();
        for (day_offset, value) in [(2, 10.0), (0, 4.0), (2, 20.0), (1, 7.0)] {
            let mut e = event("click", "web", json!({"value": value}), 0);
            e.ts = base + Duration::days(day_offset);
            events.push(e);
        }

        let trends = daily_trends(&events);
        assert_eq!(trends.len(), 3);
        assert!(trends.windows(2).all(|w| w[0].day < w[1].day));

        assert_eq!(trends[0].count, 1);
        assert_eq!(trends[0].total_value, Some(4.0));
        assert_eq!(trends[2].count, 2);
        assert_eq!(trends[2].average_value, Some(15.0));
    }
}
