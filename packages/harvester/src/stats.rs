//! Read-only statistics projection over run and job history.
//!
//! Pure aggregation: callers fetch the rows, this module only folds them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Job, JobStatus, RunRecord};

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_runs: i64,
    pub total_found: i64,
    pub total_new: i64,
    pub adapters: Vec<AdapterStats>,
    /// Average duration of completed jobs, when any completed job has both
    /// timestamps recorded.
    pub average_job_duration_secs: Option<f64>,
    pub daily: Vec<DailyStats>,
    /// Whether a batch is scheduled or running right now.
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdapterStats {
    pub identifier: String,
    pub runs: i64,
    pub successes: i64,
    pub failures: i64,
    pub found: i64,
    pub new: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub runs: i64,
    pub new: i64,
}

/// Fold run and job history into a snapshot.
pub fn project(runs: &[RunRecord], jobs: &[Job], is_active: bool) -> StatsSnapshot {
    let mut per_adapter: BTreeMap<&str, AdapterStats> = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, DailyStats> = BTreeMap::new();
    let mut total_found = 0;
    let mut total_new = 0;

    for run in runs {
        total_found += run.count_found;
        total_new += run.count_new;

        let entry = per_adapter
            .entry(run.adapter.as_str())
            .or_insert_with(|| AdapterStats {
                identifier: run.adapter.clone(),
                runs: 0,
                successes: 0,
                failures: 0,
                found: 0,
                new: 0,
            });
        entry.runs += 1;
        if run.success {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
        entry.found += run.count_found;
        entry.new += run.count_new;

        let date = run.ran_at.date_naive();
        let day = per_day.entry(date).or_insert_with(|| DailyStats {
            date,
            runs: 0,
            new: 0,
        });
        day.runs += 1;
        day.new += run.count_new;
    }

    let durations: Vec<f64> = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .filter_map(Job::duration_secs)
        .collect();
    let average_job_duration_secs = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<f64>() / durations.len() as f64)
    };

    StatsSnapshot {
        total_runs: runs.len() as i64,
        total_found,
        total_new,
        adapters: per_adapter.into_values().collect(),
        average_job_duration_secs,
        daily: per_day.into_values().collect(),
        is_active,
    }
}
