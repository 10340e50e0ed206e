//! Shared test harness: in-memory store, mock adapters, orchestrator setup.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use harvester_core::adapters::{AdapterRegistry, SourceAdapter};
use harvester_core::model::{JobView, RawPosting};
use harvester_core::{HarvesterConfig, Orchestrator, Store, Transport};

/// Fresh in-memory database with migrations applied. A single connection
/// keeps every query on the same memory instance.
pub async fn test_store() -> Store {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    Store::new(pool, 50)
}

/// Transport with pacing and retries disabled. Mock adapters never touch it.
pub fn test_transport() -> Arc<Transport> {
    let config = HarvesterConfig {
        inter_request_delay: Duration::ZERO,
        retry_count: 0,
        ..HarvesterConfig::default()
    };
    Arc::new(Transport::new(&config).expect("failed to build transport"))
}

/// Scripted adapter: returns fixed postings, fails on demand, optionally
/// holds the batch open for a while.
pub struct MockAdapter {
    pub identifier: String,
    pub company: String,
    pub postings: Vec<RawPosting>,
    pub fail: bool,
    pub delay: Duration,
}

impl MockAdapter {
    pub fn returning(identifier: &str, postings: Vec<RawPosting>) -> Self {
        Self {
            identifier: identifier.to_string(),
            company: identifier.to_string(),
            postings,
            fail: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(identifier: &str) -> Self {
        Self {
            fail: true,
            ..Self::returning(identifier, vec![])
        }
    }

    pub fn slow(identifier: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::returning(identifier, vec![])
        }
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn company(&self) -> &str {
        &self.company
    }

    fn source_url(&self) -> &str {
        "https://careers.example.com/jobs"
    }

    async fn harvest(&self, _transport: &Transport) -> Result<Vec<RawPosting>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            bail!("simulated parse failure");
        }
        Ok(self.postings.clone())
    }
}

pub fn registry(adapters: Vec<MockAdapter>) -> Arc<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(Arc::new(adapter));
    }
    Arc::new(registry)
}

pub fn orchestrator(store: Store, registry: Arc<AdapterRegistry>) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        store,
        test_transport(),
        registry,
        Duration::from_secs(300),
    ))
}

/// A raw posting with a title-dependent fingerprint.
pub fn raw_posting(title: &str, company: &str) -> RawPosting {
    RawPosting {
        title: title.to_string(),
        company: company.to_string(),
        location: "Dhaka".to_string(),
        employment_type: "Full-time".to_string(),
        experience: None,
        description: format!("{title} role description"),
        apply_link: "https://careers.example.com/apply".to_string(),
    }
}

/// Poll until the job leaves Scheduled/Running. Panics after ~5 seconds.
pub async fn wait_for_terminal(orchestrator: &Arc<Orchestrator>, job_id: Uuid) -> JobView {
    for _ in 0..250 {
        let view = orchestrator
            .get_status(job_id)
            .await
            .expect("get_status failed")
            .expect("job not found");
        if view.status.is_terminal() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not reach a terminal state in time");
}
