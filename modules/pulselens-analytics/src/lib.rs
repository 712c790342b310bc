//! The aggregation core: pure rollup math, the bucket aggregator, the
//! periodic scheduler, and the service layer fronting inbound operations.

pub mod aggregator;
pub mod report;
pub mod rollup;
pub mod scheduler;
pub mod service;

pub use aggregator::{AggregationOutcome, BucketAggregator};
pub use report::{AnalyticsReport, AnalyticsService, ReportPeriod, TypeTrend};
pub use rollup::{daily_trends, roll_up_window, summarize, DailyTrend, TypeSummary};
pub use scheduler::{RollupScheduler, SchedulerHandle, TickOutcome};
pub use service::EventService;
