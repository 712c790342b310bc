//! Analytics reads: persisted rollups, per-type summaries, daily trend
//! lines, and the combined report.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use pulselens_common::{PulseError, Rollup};
use pulselens_events::{EventRepository, RollupRepository};

use crate::rollup::{daily_trends, summarize, DailyTrend, TypeSummary};

pub struct AnalyticsService {
    events: Arc<dyn EventRepository>,
    rollups: Arc<dyn RollupRepository>,
    /// How many event types get a daily-trend breakdown in the combined
    /// report. Trend computation is the expensive part of the report, so
    /// the fan-out is a deliberate, visible knob rather than a constant.
    max_report_types: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeTrend {
    pub event_type: String,
    pub daily: Vec<DailyTrend>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub total_events: i64,
    pub period: ReportPeriod,
    pub events_by_type: Vec<TypeSummary>,
    pub trends: Vec<TypeTrend>,
}

impl AnalyticsService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        rollups: Arc<dyn RollupRepository>,
        max_report_types: usize,
    ) -> Self {
        Self {
            events,
            rollups,
            max_report_types,
        }
    }

    /// Persisted rollups for the type with period start within the trailing
    /// `last_hours`, oldest first.
    pub async fn analytics_for_period(
        &self,
        event_type: &str,
        last_hours: i64,
    ) -> Result<Vec<Rollup>, PulseError> {
        require_type(event_type)?;

        let start = Utc::now() - Duration::hours(last_hours);
        self.rollups
            .find_by_type_and_period_start_at_or_after(event_type, start)
            .await
            .map_err(store_err)
    }

    /// Per-type count / totals / last-seen over an arbitrary window.
    pub async fn summary_by_type(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TypeSummary>, PulseError> {
        let events = self
            .events
            .find_by_type_and_timestamp_between(None, start, end)
            .await
            .map_err(store_err)?;

        Ok(summarize(&events))
    }

    /// Per-day trend line for one type over the trailing `days`.
    pub async fn daily_trends(
        &self,
        event_type: &str,
        days: i64,
    ) -> Result<Vec<DailyTrend>, PulseError> {
        require_type(event_type)?;

        let end = Utc::now();
        let events = self
            .events
            .find_by_type_and_timestamp_between(Some(event_type), end - Duration::days(days), end)
            .await
            .map_err(store_err)?;

        Ok(daily_trends(&events))
    }

    /// Total count, per-type summaries, and daily trends for up to
    /// `max_report_types` types over the trailing `days`. Store failures
    /// propagate unchanged — no partial report.
    pub async fn complete_report(&self, days: i64) -> Result<AnalyticsReport, PulseError> {
        let end = Utc::now();
        let start = end - Duration::days(days);

        let total_events = self.events.count().await.map_err(store_err)?;

        let window_events = self
            .events
            .find_by_type_and_timestamp_between(None, start, end)
            .await
            .map_err(store_err)?;
        let events_by_type = summarize(&window_events);

        // Type enumeration spans all time, not just the report window, so a
        // type that went quiet still shows up (with an empty trend line).
        let all_events = self.events.find_all().await.map_err(store_err)?;
        let mut types: Vec<String> = Vec::new();
        for event in &all_events {
            if types.len() == self.max_report_types {
                break;
            }
            if !types.contains(&event.event_type) {
                types.push(event.event_type.clone());
            }
        }

        let trends: Vec<TypeTrend> = types
            .into_iter()
            .map(|event_type| {
                let events_of_type: Vec<_> = window_events
                    .iter()
                    .filter(|e| e.event_type == event_type)
                    .cloned()
                    .collect();
                TypeTrend {
                    event_type,
                    daily: daily_trends(&events_of_type),
                }
            })
            .collect();

        Ok(AnalyticsReport {
            total_events,
            period: ReportPeriod {
                start,
                end,
                duration_days: days,
            },
            events_by_type,
            trends,
        })
    }
}

fn require_type(event_type: &str) -> Result<(), PulseError> {
    if event_type.trim().is_empty() {
        return Err(PulseError::Validation("event type is required".to_string()));
    }
    Ok(())
}

fn store_err(e: anyhow::Error) -> PulseError {
    PulseError::Store(e.to_string())
}
