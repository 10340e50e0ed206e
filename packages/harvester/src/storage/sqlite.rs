//! SQLite-backed store. All queries are parameterized; filter values are
//! always bound, never interpolated.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::InsertOutcome;
use crate::fingerprint::fingerprint;
use crate::model::{
    Job, JobStatus, Page, Posting, PostingFilter, RawPosting, RunRecord, ScheduleStamp,
    SourceKind, TriggeredBy,
};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    max_page_size: i64,
}

impl Store {
    pub fn new(pool: SqlitePool, max_page_size: i64) -> Self {
        Self {
            pool,
            max_page_size,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Postings
    // ------------------------------------------------------------------

    /// The dedup gate for non-harvested submissions. The posting's apply
    /// link doubles as its source URL.
    pub async fn insert_posting(
        &self,
        raw: &RawPosting,
        source_kind: SourceKind,
        owner_label: Option<String>,
    ) -> Result<InsertOutcome> {
        let source_url = raw.apply_link.clone();
        self.insert_posting_with_source(raw, &source_url, source_kind, owner_label)
            .await
    }

    /// The dedup gate for harvested postings, which carry their adapter's
    /// listing page as the source URL.
    pub async fn insert_harvested(
        &self,
        raw: &RawPosting,
        source_url: &str,
        owner_label: Option<String>,
    ) -> Result<InsertOutcome> {
        self.insert_posting_with_source(raw, source_url, SourceKind::Harvested, owner_label)
            .await
    }

    /// Computes the fingerprint and atomically inserts the posting or
    /// rejects it. Two concurrent inserts of the same fingerprint can never
    /// both report `New` because the decision is made by the UNIQUE
    /// constraint inside a single statement.
    async fn insert_posting_with_source(
        &self,
        raw: &RawPosting,
        source_url: &str,
        source_kind: SourceKind,
        owner_label: Option<String>,
    ) -> Result<InsertOutcome> {
        let posting = Posting {
            id: Uuid::new_v4(),
            fingerprint: fingerprint(raw),
            title: raw.title.trim().to_string(),
            company: raw.company.trim().to_string(),
            location: raw.location.trim().to_string(),
            employment_type: raw.employment_type.trim().to_string(),
            experience: raw.experience.as_ref().map(|e| e.trim().to_string()),
            description: raw.description.trim().to_string(),
            apply_link: raw.apply_link.clone(),
            source_url: source_url.to_string(),
            source_kind,
            owner_label,
            is_active: true,
            view_count: 0,
            first_seen_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO postings (
                id, fingerprint, title, company, location, employment_type,
                experience, description, apply_link, source_url, source_kind,
                owner_label, is_active, view_count, first_seen_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(posting.id)
        .bind(&posting.fingerprint)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.employment_type)
        .bind(&posting.experience)
        .bind(&posting.description)
        .bind(&posting.apply_link)
        .bind(&posting.source_url)
        .bind(posting.source_kind)
        .bind(&posting.owner_label)
        .bind(posting.is_active)
        .bind(posting.view_count)
        .bind(posting.first_seen_at)
        .execute(&self.pool)
        .await
        .context("failed to insert posting")?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::New(posting))
    }

    /// Filtered, paginated listing. `per_page` is clamped to the configured
    /// maximum; text filters match case-insensitive substrings, enumerated
    /// fields match exactly.
    pub async fn list_postings(
        &self,
        filter: &PostingFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Page<Posting>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, self.max_page_size);

        let mut where_sql = String::from("WHERE is_active = 1");
        if filter.q.is_some() {
            where_sql.push_str(
                " AND (LOWER(title) LIKE ? OR LOWER(description) LIKE ? OR LOWER(company) LIKE ?)",
            );
        }
        if filter.company.is_some() {
            where_sql.push_str(" AND LOWER(company) LIKE ?");
        }
        if filter.location.is_some() {
            where_sql.push_str(" AND LOWER(location) LIKE ?");
        }
        if filter.employment_type.is_some() {
            where_sql.push_str(" AND employment_type = ?");
        }
        if filter.experience.is_some() {
            where_sql.push_str(" AND experience = ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM postings {where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(q) = &filter.q {
            let pattern = like_pattern(q);
            count_query = count_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        if let Some(company) = &filter.company {
            count_query = count_query.bind(like_pattern(company));
        }
        if let Some(location) = &filter.location {
            count_query = count_query.bind(like_pattern(location));
        }
        if let Some(employment_type) = &filter.employment_type {
            count_query = count_query.bind(employment_type.clone());
        }
        if let Some(experience) = &filter.experience {
            count_query = count_query.bind(experience.clone());
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .context("failed to count postings")?;

        let rows_sql = format!(
            "SELECT * FROM postings {where_sql} ORDER BY first_seen_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut rows_query = sqlx::query_as::<_, Posting>(&rows_sql);
        if let Some(q) = &filter.q {
            let pattern = like_pattern(q);
            rows_query = rows_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        if let Some(company) = &filter.company {
            rows_query = rows_query.bind(like_pattern(company));
        }
        if let Some(location) = &filter.location {
            rows_query = rows_query.bind(like_pattern(location));
        }
        if let Some(employment_type) = &filter.employment_type {
            rows_query = rows_query.bind(employment_type.clone());
        }
        if let Some(experience) = &filter.experience {
            rows_query = rows_query.bind(experience.clone());
        }
        let items = rows_query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&self.pool)
            .await
            .context("failed to list postings")?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        })
    }

    pub async fn increment_views(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE postings SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to increment view count")?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Run records
    // ------------------------------------------------------------------

    /// Append one run record. Records are never updated or read back for
    /// correction; they exist for auditing and statistics.
    pub async fn record_run(&self, run: &RunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO run_records (
                job_id, adapter, count_found, count_new, success, error_message, ran_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.job_id)
        .bind(&run.adapter)
        .bind(run.count_found)
        .bind(run.count_new)
        .bind(run.success)
        .bind(&run.error_message)
        .bind(run.ran_at)
        .execute(&self.pool)
        .await
        .context("failed to record run")?;
        Ok(())
    }

    pub async fn list_runs(&self, limit: i64) -> Result<Vec<RunRecord>> {
        sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT id, job_id, adapter, count_found, count_new, success, error_message, ran_at
            FROM run_records
            ORDER BY ran_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to list run records")
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Persist a job snapshot. Called on every state transition, so a job is
    /// always reconstructable after eviction from the in-memory map.
    pub async fn upsert_job(&self, job: &Job) -> Result<()> {
        let log_lines =
            serde_json::to_string(&job.log_lines).context("failed to serialize job log")?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, adapter_scope, status, triggered_by, schedule_slot, schedule_date,
                jobs_found, error_message, log_lines, created_at, started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                status = excluded.status,
                jobs_found = excluded.jobs_found,
                error_message = excluded.error_message,
                log_lines = excluded.log_lines,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(job.id)
        .bind(&job.adapter_scope)
        .bind(job.status)
        .bind(job.triggered_by)
        .bind(job.schedule.as_ref().map(|s| s.slot.clone()))
        .bind(job.schedule.as_ref().map(|s| s.date))
        .bind(job.jobs_found)
        .bind(&job.error_message)
        .bind(log_lines)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .context("failed to upsert job")?;
        Ok(())
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch job")?;
        row.map(|r| job_from_row(&r)).transpose()
    }

    pub async fn recent_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC, id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("failed to list recent jobs")?;
        rows.iter().map(job_from_row).collect()
    }

    /// Whether a schedule slot already produced a job on the given date.
    /// Reads persisted history so the guard survives restarts.
    pub async fn has_schedule_fired(&self, slot: &str, date: NaiveDate) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE triggered_by = ? AND schedule_slot = ? AND schedule_date = ?
            "#,
        )
        .bind(TriggeredBy::Schedule)
        .bind(slot)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .context("failed to check schedule guard")?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Retention
    // ------------------------------------------------------------------

    /// Purge postings and run records older than the horizon. Returns
    /// (purged postings, purged run records).
    pub async fn sweep_retention(&self, horizon_days: i64) -> Result<(u64, u64)> {
        let cutoff = Utc::now() - chrono::Duration::days(horizon_days);

        let postings = sqlx::query("DELETE FROM postings WHERE first_seen_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("failed to purge old postings")?
            .rows_affected();

        let runs = sqlx::query("DELETE FROM run_records WHERE ran_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("failed to purge old run records")?
            .rows_affected();

        Ok((postings, runs))
    }
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let log_raw: String = row.try_get("log_lines").context("jobs.log_lines")?;
    let schedule_slot: Option<String> = row.try_get("schedule_slot")?;
    let schedule_date: Option<NaiveDate> = row.try_get("schedule_date")?;
    let schedule = match (schedule_slot, schedule_date) {
        (Some(slot), Some(date)) => Some(ScheduleStamp { slot, date }),
        _ => None,
    };

    Ok(Job {
        id: row.try_get("id")?,
        adapter_scope: row.try_get("adapter_scope")?,
        status: row.try_get::<JobStatus, _>("status")?,
        triggered_by: row.try_get::<TriggeredBy, _>("triggered_by")?,
        schedule,
        jobs_found: row.try_get("jobs_found")?,
        error_message: row.try_get("error_message")?,
        log_lines: serde_json::from_str(&log_raw).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.trim().to_lowercase())
}
