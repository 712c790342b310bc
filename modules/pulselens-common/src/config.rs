use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Rollup scheduler
    pub aggregation_interval_secs: u64,

    // Cache sweeper
    pub sweep_interval_secs: u64,
    pub sweep_max_age_hours: i64,

    // Analytics reports: how many event types get a daily-trend breakdown
    pub max_report_types: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            aggregation_interval_secs: parsed_env("AGGREGATION_INTERVAL_SECS", 300),
            sweep_interval_secs: parsed_env("SWEEP_INTERVAL_SECS", 3600),
            sweep_max_age_hours: parsed_env("SWEEP_MAX_AGE_HOURS", 24),
            max_report_types: parsed_env("MAX_REPORT_TYPES", 5),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got `{raw}`")),
        Err(_) => default,
    }
}
