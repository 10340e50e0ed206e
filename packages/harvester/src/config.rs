//! Environment-driven configuration.
//!
//! Every knob has a default so the daemon starts with nothing but a
//! `DATABASE_URL` (and even that falls back to a local file). Values are read
//! once at startup; `dotenvy` is invoked by the binary before this runs.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub database_url: String,
    /// Per-request timeout for outbound HTTP.
    pub request_timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub retry_count: u32,
    /// Minimum delay between any two outbound requests, shared across hosts.
    pub inter_request_delay: Duration,
    /// HTTP status codes treated as transient.
    pub transient_statuses: Vec<u16>,
    /// Wall-clock times at which a full-roster harvest is triggered daily.
    pub schedule_times: Vec<ScheduleTime>,
    /// Postings and run records older than this are purged by the sweep.
    pub retention_days: i64,
    /// Upper bound applied to any `per_page` listing argument.
    pub max_page_size: i64,
    /// How long a terminal job stays in the in-memory map before eviction.
    pub job_cache_grace: Duration,
}

/// One configured "HH:MM" trigger slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTime {
    /// Original label, used for the persisted fired-today guard.
    pub label: String,
    pub time: NaiveTime,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://harvester.db?mode=rwc".to_string(),
            request_timeout: Duration::from_secs(30),
            retry_count: 3,
            inter_request_delay: Duration::from_millis(1500),
            transient_statuses: vec![429, 500, 502, 503, 504],
            schedule_times: parse_schedule_times("09:00,21:00").expect("default schedule parses"),
            retention_days: 90,
            max_page_size: 50,
            job_cache_grace: Duration::from_secs(600),
        }
    }
}

impl HarvesterConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let schedule_times = match std::env::var("SCHEDULE_TIMES") {
            Ok(raw) => parse_schedule_times(&raw)
                .with_context(|| format!("invalid SCHEDULE_TIMES '{raw}'"))?,
            Err(_) => defaults.schedule_times,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            request_timeout: Duration::from_secs(env_parse(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            retry_count: env_parse("RETRY_COUNT", defaults.retry_count)?,
            inter_request_delay: Duration::from_millis(env_parse(
                "INTER_REQUEST_DELAY_MS",
                defaults.inter_request_delay.as_millis() as u64,
            )?),
            transient_statuses: defaults.transient_statuses,
            schedule_times,
            retention_days: env_parse("RETENTION_DAYS", defaults.retention_days)?,
            max_page_size: env_parse("MAX_PAGE_SIZE", defaults.max_page_size)?,
            job_cache_grace: Duration::from_secs(env_parse(
                "JOB_CACHE_GRACE_SECS",
                defaults.job_cache_grace.as_secs(),
            )?),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid {key} value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list of "HH:MM" slots.
pub fn parse_schedule_times(raw: &str) -> Result<Vec<ScheduleTime>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|slot| {
            let time = NaiveTime::parse_from_str(slot, "%H:%M")
                .with_context(|| format!("schedule slot '{slot}' is not HH:MM"))?;
            Ok(ScheduleTime {
                label: slot.to_string(),
                time,
            })
        })
        .collect()
}
