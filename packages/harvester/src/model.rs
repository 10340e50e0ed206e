//! Core data model for the harvesting subsystem.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle of a harvest job: Scheduled -> Running -> {Completed, Error}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Scheduled,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    /// Terminal jobs never transition again; non-terminal ones block new triggers.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    Schedule,
    Operator,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Harvested,
    Manual,
    Operator,
}

// ============================================================================
// Postings
// ============================================================================

/// What an adapter produces: one listing as scraped, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub employment_type: String,
    pub experience: Option<String>,
    pub description: String,
    pub apply_link: String,
}

/// Canonical posting row. Created at most once per fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Posting {
    pub id: Uuid,
    pub fingerprint: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub employment_type: String,
    pub experience: Option<String>,
    pub description: String,
    pub apply_link: String,
    pub source_url: String,
    pub source_kind: SourceKind,
    pub owner_label: Option<String>,
    pub is_active: bool,
    pub view_count: i64,
    pub first_seen_at: DateTime<Utc>,
}

/// Filter set for posting listings. Text fields match as case-insensitive
/// substrings; `employment_type` and `experience` match exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingFilter {
    pub q: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience: Option<String>,
}

/// One page of a listing query.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

// ============================================================================
// Run records
// ============================================================================

/// Immutable audit row for one adapter execution within a job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunRecord {
    #[serde(default)]
    pub id: i64,
    pub job_id: Option<Uuid>,
    pub adapter: String,
    pub count_found: i64,
    pub count_new: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub ran_at: DateTime<Utc>,
}

// ============================================================================
// Jobs
// ============================================================================

/// Identifies which daily schedule slot produced a job, so the "already ran
/// today" guard can be answered from persisted history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStamp {
    /// Configured wall-clock slot, e.g. "09:00".
    pub slot: String,
    pub date: NaiveDate,
}

/// One orchestrator-tracked execution, covering a single adapter or the
/// whole roster.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    /// None means the full roster.
    pub adapter_scope: Option<String>,
    pub status: JobStatus,
    pub triggered_by: TriggeredBy,
    #[serde(skip)]
    pub schedule: Option<ScheduleStamp>,
    pub jobs_found: i64,
    pub error_message: Option<String>,
    pub log_lines: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        adapter_scope: Option<String>,
        triggered_by: TriggeredBy,
        schedule: Option<ScheduleStamp>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            adapter_scope,
            status: JobStatus::Scheduled,
            triggered_by,
            schedule,
            jobs_found: 0,
            error_message: None,
            log_lines: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Append a timestamped line to the ordered job log.
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.log_lines
            .push(format!("[{}] {}", Utc::now().format("%H:%M:%S"), line));
    }

    /// Duration between start and completion, if both are recorded.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(s), Some(c)) => Some((c - s).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Read-only projection of a job handed to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub adapter_scope: Option<String>,
    pub status: JobStatus,
    pub triggered_by: TriggeredBy,
    pub jobs_found: i64,
    pub error_message: Option<String>,
    pub log_lines: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            adapter_scope: job.adapter_scope.clone(),
            status: job.status,
            triggered_by: job.triggered_by,
            jobs_found: job.jobs_found,
            error_message: job.error_message.clone(),
            log_lines: job.log_lines.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Adapter roster entry as shown to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterInfo {
    pub identifier: String,
    pub company: String,
    pub source_url: String,
}
