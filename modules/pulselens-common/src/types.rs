//! Core domain types. Shared by the stores, the cache, and the analytics layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload field holding the numeric metric used for rollups and anomaly checks.
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Received,
    Processing,
    Processed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Received => "received",
            EventStatus::Processing => "processing",
            EventStatus::Processed => "processed",
            EventStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(EventStatus::Received),
            "processing" => Some(EventStatus::Processing),
            "processed" => Some(EventStatus::Processed),
            "failed" => Some(EventStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event as persisted. Returned by all read methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    pub source: String,
    pub user_id: Option<String>,
    pub ts: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub correlation_id: Option<String>,
    pub status: EventStatus,
}

impl Event {
    /// The numeric `value` payload field, if present and numeric.
    /// Events without it are counted in rollups but excluded from metric math.
    pub fn numeric_value(&self) -> Option<f64> {
        self.payload.get(VALUE_FIELD).and_then(|v| v.as_f64())
    }
}

/// An event to be ingested. The store assigns the id; timestamp and status
/// default at save time when the caller leaves them unset.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: String,
    pub source: String,
    pub user_id: Option<String>,
    pub ts: Option<DateTime<Utc>>,
    pub payload: serde_json::Value,
    pub correlation_id: Option<String>,
    pub status: Option<EventStatus>,
}

impl NewEvent {
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            user_id: None,
            ts: None,
            payload,
            correlation_id: None,
            status: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_ts(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Hourly rollup of one event type. (event_type, period_start) is the
/// natural key; the store upserts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub event_type: String,
    /// Inclusive.
    pub period_start: DateTime<Utc>,
    /// Exclusive.
    pub period_end: DateTime<Utc>,
    pub count: i64,
    pub count_by_source: HashMap<String, i64>,
    pub averages_by_metric: HashMap<String, f64>,
    pub additional_metrics: serde_json::Value,
}
