//! Harvest orchestration: job lifecycle, the single-active-batch gate, and
//! the background worker that walks the roster.
//!
//! ```text
//! trigger()
//!     │  (Busy unless no job is Scheduled/Running)
//!     ├─► Job created in Scheduled, persisted, resident in the map
//!     └─► spawned worker
//!             ├─► Running (persisted)
//!             ├─► adapters strictly in roster order
//!             │       ├─► harvest() through the shared Transport
//!             │       ├─► dedup gate per posting, "new" outcomes counted
//!             │       └─► RunRecord appended (failure isolated per adapter)
//!             └─► Completed, or Error for orchestration-level failures only
//! ```
//!
//! The orchestrator exclusively owns Job writes. A worker owns its job until
//! each snapshot is persisted; readers only ever see persisted snapshots.
//! Terminal jobs stay resident for a grace period, then eviction falls back
//! to durable storage. There is no mid-run cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::{AdapterRegistry, SourceAdapter};
use crate::error::TriggerError;
use crate::model::{Job, JobStatus, JobView, RunRecord, ScheduleStamp, TriggeredBy};
use crate::storage::Store;
use crate::transport::Transport;

pub struct Orchestrator {
    store: Store,
    transport: Arc<Transport>,
    registry: Arc<AdapterRegistry>,
    /// How long terminal jobs stay in the resident map.
    grace: Duration,
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl Orchestrator {
    pub fn new(
        store: Store,
        transport: Arc<Transport>,
        registry: Arc<AdapterRegistry>,
        grace: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            registry,
            grace,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Create a job and hand it to a background worker. Returns the job id
    /// immediately; execution proceeds asynchronously.
    ///
    /// At most one batch may be active system-wide: a call while any job is
    /// Scheduled or Running returns [`TriggerError::Busy`] and creates
    /// nothing.
    pub async fn trigger(
        self: &Arc<Self>,
        scope: Option<&str>,
        triggered_by: TriggeredBy,
        schedule: Option<ScheduleStamp>,
    ) -> Result<Uuid, TriggerError> {
        let job = {
            let mut jobs = self.jobs.write().await;
            prune_terminal(&mut jobs, self.grace);
            if jobs.values().any(|j| !j.status.is_terminal()) {
                return Err(TriggerError::Busy);
            }

            let mut job = Job::new(scope.map(String::from), triggered_by, schedule);
            match scope {
                Some(id) => job.log(format!("scheduled harvest of adapter {id}")),
                None => job.log(format!(
                    "scheduled harvest of full roster ({} adapters)",
                    self.registry.len()
                )),
            }
            jobs.insert(job.id, job.clone());
            job
        };

        // Persist before the worker exists; a job must never be observable
        // in memory only.
        if let Err(e) = self.store.upsert_job(&job).await {
            self.jobs.write().await.remove(&job.id);
            return Err(TriggerError::Storage(e));
        }

        info!(job_id = %job.id, ?triggered_by, scope, "harvest job triggered");

        let this = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            this.run_batch(job_id).await;
        });

        Ok(job_id)
    }

    /// Resident job if still in the grace window, else the persisted row.
    /// Never fails for a job that once existed.
    pub async fn get_status(&self, job_id: Uuid) -> Result<Option<JobView>> {
        {
            let mut jobs = self.jobs.write().await;
            prune_terminal(&mut jobs, self.grace);
            if let Some(job) = jobs.get(&job_id) {
                return Ok(Some(JobView::from(job)));
            }
        }
        Ok(self.store.get_job(job_id).await?.map(|j| JobView::from(&j)))
    }

    /// Resident and persisted jobs merged, newest first.
    pub async fn get_recent_jobs(&self, limit: i64) -> Result<Vec<JobView>> {
        let mut merged: HashMap<Uuid, Job> = self
            .store
            .recent_jobs(limit)
            .await?
            .into_iter()
            .map(|j| (j.id, j))
            .collect();

        {
            let mut jobs = self.jobs.write().await;
            prune_terminal(&mut jobs, self.grace);
            for job in jobs.values() {
                merged.insert(job.id, job.clone());
            }
        }

        let mut views: Vec<Job> = merged.into_values().collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views.truncate(limit.max(0) as usize);
        Ok(views.iter().map(JobView::from).collect())
    }

    /// Whether a batch is currently scheduled or running.
    pub async fn is_active(&self) -> bool {
        self.jobs
            .read()
            .await
            .values()
            .any(|j| !j.status.is_terminal())
    }

    // ------------------------------------------------------------------
    // Worker
    // ------------------------------------------------------------------

    async fn run_batch(self: Arc<Self>, job_id: Uuid) {
        if let Err(err) = self.run_batch_inner(job_id).await {
            error!(%job_id, "harvest job failed: {err:#}");
            self.mark_error(job_id, &err).await;
        }
    }

    async fn run_batch_inner(&self, job_id: Uuid) -> Result<()> {
        let Some(mut job) = self.jobs.read().await.get(&job_id).cloned() else {
            bail!("job {job_id} vanished from the resident map before starting");
        };

        // Resolving the scope is an orchestration concern: an unknown
        // identifier fails the whole job before any adapter runs.
        let adapters: Vec<Arc<dyn SourceAdapter>> = match &job.adapter_scope {
            Some(id) => match self.registry.get(id) {
                Some(adapter) => vec![adapter],
                None => bail!("unknown adapter identifier: {id}"),
            },
            None => self.registry.all().to_vec(),
        };

        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        job.log(format!("running {} adapter(s)", adapters.len()));
        self.save(&job).await?;

        // Strictly sequential: the shared rate limiter stays meaningful and
        // run-log attribution stays simple.
        for adapter in adapters {
            self.run_adapter(&mut job, adapter.as_ref()).await?;
            self.save(&job).await?;
        }

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.log(format!("completed with {} postings found", job.jobs_found));
        self.save(&job).await?;

        info!(%job_id, jobs_found = job.jobs_found, "harvest job completed");
        Ok(())
    }

    /// Execute one adapter and append its run record. Adapter failures are
    /// recorded and isolated — they never abort the batch. Only storage
    /// failures propagate.
    async fn run_adapter(&self, job: &mut Job, adapter: &dyn SourceAdapter) -> Result<()> {
        let identifier = adapter.identifier().to_string();
        job.log(format!("harvesting {identifier}"));

        let mut run = RunRecord {
            id: 0,
            job_id: Some(job.id),
            adapter: identifier.clone(),
            count_found: 0,
            count_new: 0,
            success: false,
            error_message: None,
            ran_at: Utc::now(),
        };

        match adapter.harvest(&self.transport).await {
            Ok(raws) => {
                run.count_found = raws.len() as i64;
                for raw in &raws {
                    let outcome = self
                        .store
                        .insert_harvested(raw, adapter.source_url(), None)
                        .await
                        .with_context(|| format!("storing posting from {identifier}"))?;
                    if outcome.is_new() {
                        run.count_new += 1;
                    }
                }
                run.success = true;
                job.jobs_found += run.count_found;
                job.log(format!(
                    "{identifier}: found {}, new {}",
                    run.count_found, run.count_new
                ));
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(adapter = %identifier, "adapter harvest failed: {message}");
                run.error_message = Some(message.clone());
                job.log(format!("{identifier}: failed: {message}"));
            }
        }

        self.store.record_run(&run).await
    }

    /// Persist a snapshot, then publish it to the resident map. The worker
    /// never proceeds past an unpersisted transition.
    async fn save(&self, job: &Job) -> Result<()> {
        self.store.upsert_job(job).await?;
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn mark_error(&self, job_id: Uuid, err: &anyhow::Error) {
        let job = self.jobs.read().await.get(&job_id).cloned();
        let Some(mut job) = job else { return };

        job.status = JobStatus::Error;
        job.error_message = Some(format!("{err:#}"));
        job.completed_at = Some(Utc::now());
        job.log(format!("failed: {err:#}"));
        if let Err(save_err) = self.save(&job).await {
            error!(%job_id, "failed to persist error state: {save_err:#}");
        }
    }
}

/// Drop terminal jobs whose grace window has elapsed. Their persisted rows
/// remain queryable.
fn prune_terminal(jobs: &mut HashMap<Uuid, Job>, grace: Duration) {
    let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
    let now = Utc::now();
    jobs.retain(|_, job| {
        if !job.status.is_terminal() {
            return true;
        }
        match job.completed_at {
            Some(done) => now - done <= grace,
            None => true,
        }
    });
}
