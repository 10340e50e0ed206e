//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! A minute tick evaluates the configured wall-clock slots and triggers a
//! full-roster harvest for any slot whose time has been reached today and
//! that has not fired yet. The "already fired" guard reads persisted job
//! history, so it survives restarts. A daily tick runs the retention sweep.

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use std::sync::Arc;

use crate::config::ScheduleTime;
use crate::error::TriggerError;
use crate::model::{ScheduleStamp, TriggeredBy};
use crate::orchestrator::Orchestrator;
use crate::storage::Store;

#[derive(Clone)]
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    store: Store,
    slots: Vec<ScheduleTime>,
    retention_days: i64,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Store,
        slots: Vec<ScheduleTime>,
        retention_days: i64,
    ) -> Self {
        Self {
            orchestrator,
            store,
            slots,
            retention_days,
        }
    }

    /// Start the cron loops. Returns the running scheduler; call its
    /// `shutdown` for a clean stop.
    pub async fn start(self) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let tick = self.clone();
        let slot_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
            let tick = tick.clone();
            Box::pin(async move {
                if let Err(e) = tick.check_slots(Local::now()).await {
                    error!("schedule tick failed: {e:#}");
                }
            })
        })?;
        scheduler.add(slot_job).await?;

        let sweep = self.clone();
        let sweep_job = Job::new_async("0 10 3 * * *", move |_uuid, _lock| {
            let sweep = sweep.clone();
            Box::pin(async move {
                match sweep.store.sweep_retention(sweep.retention_days).await {
                    Ok((postings, runs)) => info!(
                        postings,
                        runs, "retention sweep purged rows older than {} days", sweep.retention_days
                    ),
                    Err(e) => error!("retention sweep failed: {e:#}"),
                }
            })
        })?;
        scheduler.add(sweep_job).await?;

        scheduler.start().await?;
        info!(
            slots = ?self.slots.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            "scheduler started (minute tick + daily retention sweep)"
        );
        Ok(scheduler)
    }

    /// Evaluate every configured slot against `now`. Separated from the cron
    /// loop so tests can drive it with a fixed clock.
    ///
    /// A slot fires when its time has been reached today and persisted
    /// history shows no schedule-triggered job for (slot, today). `Busy` is
    /// not an error — the slot stays unfired and is retried on the next tick.
    pub async fn check_slots(&self, now: DateTime<Local>) -> Result<Vec<Uuid>> {
        let today = now.date_naive();
        let mut triggered = Vec::new();

        for slot in &self.slots {
            if now.time() < slot.time {
                continue;
            }
            if self.store.has_schedule_fired(&slot.label, today).await? {
                continue;
            }

            let stamp = ScheduleStamp {
                slot: slot.label.clone(),
                date: today,
            };
            match self
                .orchestrator
                .trigger(None, TriggeredBy::Schedule, Some(stamp))
                .await
            {
                Ok(job_id) => {
                    info!(%job_id, slot = %slot.label, "scheduled harvest triggered");
                    triggered.push(job_id);
                }
                Err(TriggerError::Busy) => {
                    warn!(slot = %slot.label, "batch already active, slot deferred to next tick");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(triggered)
    }
}
