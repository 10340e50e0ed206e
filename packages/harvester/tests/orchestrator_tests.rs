//! Orchestrator lifecycle tests: the single-active-batch gate, per-adapter
//! failure isolation, status fallback to storage, and dedup across batches.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    orchestrator, raw_posting, registry, test_store, test_transport, wait_for_terminal,
    MockAdapter,
};
use harvester_core::model::{JobStatus, TriggeredBy};
use harvester_core::{Orchestrator, TriggerError};

#[tokio::test]
async fn a_failing_adapter_does_not_fail_the_batch() {
    let store = test_store().await;
    let registry = registry(vec![
        MockAdapter::returning(
            "alpha",
            vec![
                raw_posting("Backend Engineer", "Alpha"),
                raw_posting("Frontend Engineer", "Alpha"),
            ],
        ),
        MockAdapter::failing("beta"),
        MockAdapter::returning("gamma", vec![raw_posting("Data Engineer", "Gamma")]),
    ]);
    let orch = orchestrator(store.clone(), registry);

    let job_id = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    let view = wait_for_terminal(&orch, job_id).await;

    assert_eq!(view.status, JobStatus::Completed);
    // Only the two successful adapters contribute to the aggregate.
    assert_eq!(view.jobs_found, 3);
    assert!(view.error_message.is_none());

    let runs = store.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 3);

    let beta = runs.iter().find(|r| r.adapter == "beta").unwrap();
    assert!(!beta.success);
    assert!(!beta.error_message.as_deref().unwrap_or("").is_empty());
    assert_eq!(beta.count_found, 0);

    for id in ["alpha", "gamma"] {
        let run = runs.iter().find(|r| r.adapter == id).unwrap();
        assert!(run.success);
        assert_eq!(run.job_id, Some(job_id));
    }
}

#[tokio::test]
async fn a_batch_where_every_adapter_fails_still_completes() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::failing("a"), MockAdapter::failing("b")]);
    let orch = orchestrator(store, registry);

    let job_id = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    let view = wait_for_terminal(&orch, job_id).await;

    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.jobs_found, 0);
}

#[tokio::test]
async fn trigger_while_a_batch_is_active_returns_busy_and_creates_no_job() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::slow("slow", Duration::from_millis(300))]);
    let orch = orchestrator(store.clone(), registry);

    let first = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();

    let second = orch.trigger(None, TriggeredBy::Operator, None).await;
    assert!(matches!(second, Err(TriggerError::Busy)));
    assert_eq!(store.recent_jobs(10).await.unwrap().len(), 1);

    wait_for_terminal(&orch, first).await;

    // The gate opens again once the batch is terminal.
    let third = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    wait_for_terminal(&orch, third).await;
}

#[tokio::test]
async fn unknown_adapter_scope_marks_the_job_error() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::returning("known", vec![])]);
    let orch = orchestrator(store, registry);

    let job_id = orch
        .trigger(Some("no-such-adapter"), TriggeredBy::Operator, None)
        .await
        .unwrap();
    let view = wait_for_terminal(&orch, job_id).await;

    assert_eq!(view.status, JobStatus::Error);
    let message = view.error_message.unwrap();
    assert!(message.contains("no-such-adapter"));
}

#[tokio::test]
async fn scoped_trigger_runs_only_the_named_adapter() {
    let store = test_store().await;
    let registry = registry(vec![
        MockAdapter::returning("alpha", vec![raw_posting("Backend Engineer", "Alpha")]),
        MockAdapter::returning("beta", vec![raw_posting("QA Analyst", "Beta")]),
    ]);
    let orch = orchestrator(store.clone(), registry);

    let job_id = orch
        .trigger(Some("beta"), TriggeredBy::Operator, None)
        .await
        .unwrap();
    let view = wait_for_terminal(&orch, job_id).await;

    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.jobs_found, 1);

    let runs = store.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].adapter, "beta");
}

#[tokio::test]
async fn re_harvests_count_zero_new_postings() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::returning(
        "alpha",
        vec![raw_posting("Backend Engineer", "Alpha")],
    )]);
    let orch = orchestrator(store.clone(), registry);

    let first = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    wait_for_terminal(&orch, first).await;

    let second = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    wait_for_terminal(&orch, second).await;

    let runs = store.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    // Newest first: the re-harvest found the posting but stored nothing new.
    assert_eq!(runs[0].count_found, 1);
    assert_eq!(runs[0].count_new, 0);
    assert_eq!(runs[1].count_new, 1);
}

#[tokio::test]
async fn status_survives_eviction_from_the_resident_map() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::returning(
        "alpha",
        vec![raw_posting("Backend Engineer", "Alpha")],
    )]);
    // Zero grace: terminal jobs are evicted on the next map access.
    let orch = Arc::new(Orchestrator::new(
        store.clone(),
        test_transport(),
        registry,
        Duration::ZERO,
    ));

    let job_id = orch
        .trigger(None, TriggeredBy::Operator, None)
        .await
        .unwrap();
    let view = wait_for_terminal(&orch, job_id).await;
    assert_eq!(view.status, JobStatus::Completed);

    // Force a prune, then read again: the answer now comes from storage.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let from_storage = orch.get_status(job_id).await.unwrap().unwrap();
    assert_eq!(from_storage.status, JobStatus::Completed);
    assert_eq!(from_storage.jobs_found, 1);
    assert!(!from_storage.log_lines.is_empty());

    let recent = orch.get_recent_jobs(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, job_id);
}

#[tokio::test]
async fn recent_jobs_merge_newest_first_with_a_limit() {
    let store = test_store().await;
    let registry = registry(vec![MockAdapter::returning("alpha", vec![])]);
    let orch = orchestrator(store, registry);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = orch
            .trigger(None, TriggeredBy::System, None)
            .await
            .unwrap();
        wait_for_terminal(&orch, id).await;
        ids.push(id);
    }

    let recent = orch.get_recent_jobs(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, ids[2]);
    assert_eq!(recent[1].id, ids[1]);
}
