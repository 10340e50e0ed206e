//! The facade the surrounding system talks to.
//!
//! Bundles the store and the orchestrator behind one injected struct so the
//! consumer (an HTTP layer, a CLI, another service) never reaches into the
//! internals.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::error::TriggerError;
use crate::model::{
    AdapterInfo, JobView, Page, Posting, PostingFilter, RawPosting, SourceKind, TriggeredBy,
};
use crate::orchestrator::Orchestrator;
use crate::stats::{self, StatsSnapshot};
use crate::storage::{InsertOutcome, Store};

/// How many history rows feed the statistics projection.
const STATS_RUN_WINDOW: i64 = 500;
const STATS_JOB_WINDOW: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    New,
    Duplicate,
}

/// Outcome of submitting one posting through the public surface.
#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub status: SubmitStatus,
    pub posting: Option<Posting>,
}

pub struct HarvesterService {
    store: Store,
    orchestrator: Arc<Orchestrator>,
}

impl HarvesterService {
    pub fn new(store: Store, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Store one externally submitted posting through the dedup gate.
    pub async fn post_job(
        &self,
        raw: &RawPosting,
        owner_label: Option<String>,
    ) -> Result<SubmitOutcome> {
        let outcome = self
            .store
            .insert_posting(raw, SourceKind::Manual, owner_label)
            .await?;
        Ok(match outcome {
            InsertOutcome::New(posting) => SubmitOutcome {
                status: SubmitStatus::New,
                posting: Some(posting),
            },
            InsertOutcome::Duplicate => SubmitOutcome {
                status: SubmitStatus::Duplicate,
                posting: None,
            },
        })
    }

    /// Filtered, paginated posting listing.
    pub async fn list_jobs(
        &self,
        filter: &PostingFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Page<Posting>> {
        self.store.list_postings(filter, page, per_page).await
    }

    /// Count one view of a posting. Returns false for an unknown id.
    pub async fn record_view(&self, posting_id: Uuid) -> Result<bool> {
        self.store.increment_views(posting_id).await
    }

    /// Trigger a harvest of one adapter or the full roster.
    pub async fn trigger(
        &self,
        adapter_scope: Option<&str>,
        triggered_by: TriggeredBy,
    ) -> Result<Uuid, TriggerError> {
        self.orchestrator
            .trigger(adapter_scope, triggered_by, None)
            .await
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<Option<JobView>> {
        self.orchestrator.get_status(job_id).await
    }

    pub async fn get_recent_jobs(&self, limit: i64) -> Result<Vec<JobView>> {
        self.orchestrator.get_recent_jobs(limit).await
    }

    pub fn get_available_adapters(&self) -> Vec<AdapterInfo> {
        self.orchestrator.registry().infos()
    }

    /// Aggregate harvest statistics over recent history.
    pub async fn get_stats(&self) -> Result<StatsSnapshot> {
        let runs = self.store.list_runs(STATS_RUN_WINDOW).await?;
        let jobs = self.store.recent_jobs(STATS_JOB_WINDOW).await?;
        let is_active = self.orchestrator.is_active().await;
        Ok(stats::project(&runs, &jobs, is_active))
    }
}
