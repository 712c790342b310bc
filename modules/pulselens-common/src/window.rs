//! Half-open time windows used to bucket events for aggregation.

use chrono::{DateTime, Duration, DurationRound, Utc};

/// A half-open interval [start, end). The rollup granularity is one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HourWindow {
    /// The most recently closed full hour as seen from `now`:
    /// [now.trunc(hour) - 1h, now.trunc(hour)).
    pub fn previous_full_hour(now: DateTime<Utc>) -> Self {
        let end = truncate_to_hour(now);
        Self {
            start: end - Duration::hours(1),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl std::fmt::Display for HourWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Truncate a timestamp down to the top of its hour.
pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    // duration_trunc only fails for durations near the i64 limit; one hour is fine.
    t.duration_trunc(Duration::hours(1))
        .expect("hour truncation is infallible for an in-range timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn previous_full_hour_is_the_closed_hour_before_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 42, 17).unwrap();
        let window = HourWindow::previous_full_hour(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap());
        assert!(window.start < window.end);
    }

    #[test]
    fn exact_hour_boundary_truncates_to_itself() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();
        let window = HourWindow::previous_full_hour(now);

        assert_eq!(window.end, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
    }

    #[test]
    fn window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let window = HourWindow::previous_full_hour(now);

        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
        assert!(window.contains(window.end - Duration::nanoseconds(1)));
        assert!(!window.contains(window.start - Duration::nanoseconds(1)));
    }

    #[test]
    fn crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 12, 0).unwrap();
        let window = HourWindow::previous_full_hour(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 14, 23, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
    }
}
