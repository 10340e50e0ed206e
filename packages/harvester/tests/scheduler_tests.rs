//! Scheduler slot tests: one job per slot per day, with the fired-today
//! guard answered from persisted history.

mod common;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};

use common::{orchestrator, raw_posting, registry, test_store, wait_for_terminal, MockAdapter};
use harvester_core::config::parse_schedule_times;
use harvester_core::model::TriggeredBy;
use harvester_core::Scheduler;

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Local> {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
        .and_local_timezone(Local)
        .single()
        .expect("unambiguous local time")
}

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
}

#[tokio::test]
async fn a_slot_fires_exactly_once_per_day() {
    let store = test_store().await;
    let orch = orchestrator(
        store.clone(),
        registry(vec![MockAdapter::returning(
            "alpha",
            vec![raw_posting("Backend Engineer", "Alpha")],
        )]),
    );
    let scheduler = Scheduler::new(
        orch.clone(),
        store,
        parse_schedule_times("09:00,21:00").unwrap(),
        90,
    );

    // Before the slot: nothing fires.
    let before = scheduler.check_slots(at(test_date(), 8, 59)).await.unwrap();
    assert!(before.is_empty());

    // At 09:00: exactly one job, attributed to the schedule.
    let fired = scheduler.check_slots(at(test_date(), 9, 0)).await.unwrap();
    assert_eq!(fired.len(), 1);
    let view = wait_for_terminal(&orch, fired[0]).await;
    assert_eq!(view.triggered_by, TriggeredBy::Schedule);

    // A repeated check at 09:00 the same day creates no second job.
    let again = scheduler.check_slots(at(test_date(), 9, 0)).await.unwrap();
    assert!(again.is_empty());

    // Later ticks the same day leave the fired slot alone but hit 21:00.
    let evening = scheduler.check_slots(at(test_date(), 21, 0)).await.unwrap();
    assert_eq!(evening.len(), 1);
    wait_for_terminal(&orch, evening[0]).await;
}

#[tokio::test]
async fn the_guard_reads_persisted_history_across_restarts() {
    let store = test_store().await;
    let roster = || {
        registry(vec![MockAdapter::returning(
            "alpha",
            vec![raw_posting("Backend Engineer", "Alpha")],
        )])
    };

    let orch = orchestrator(store.clone(), roster());
    let scheduler = Scheduler::new(
        orch.clone(),
        store.clone(),
        parse_schedule_times("09:00").unwrap(),
        90,
    );
    let fired = scheduler.check_slots(at(test_date(), 9, 5)).await.unwrap();
    assert_eq!(fired.len(), 1);
    wait_for_terminal(&orch, fired[0]).await;

    // Fresh orchestrator and scheduler over the same database, as after a
    // process restart: the slot must not fire again today.
    let restarted_orch = orchestrator(store.clone(), roster());
    let restarted = Scheduler::new(
        restarted_orch,
        store,
        parse_schedule_times("09:00").unwrap(),
        90,
    );
    let refired = restarted.check_slots(at(test_date(), 9, 6)).await.unwrap();
    assert!(refired.is_empty());
}

#[tokio::test]
async fn a_new_day_rearms_the_slot() {
    let store = test_store().await;
    let orch = orchestrator(
        store.clone(),
        registry(vec![MockAdapter::returning("alpha", vec![])]),
    );
    let scheduler = Scheduler::new(
        orch.clone(),
        store,
        parse_schedule_times("09:00").unwrap(),
        90,
    );

    let day_one = scheduler.check_slots(at(test_date(), 9, 0)).await.unwrap();
    assert_eq!(day_one.len(), 1);
    wait_for_terminal(&orch, day_one[0]).await;

    let next_day = test_date().succ_opt().unwrap();
    let day_two = scheduler.check_slots(at(next_day, 9, 0)).await.unwrap();
    assert_eq!(day_two.len(), 1);
    wait_for_terminal(&orch, day_two[0]).await;
}

#[tokio::test]
async fn a_busy_orchestrator_defers_the_slot_without_erroring() {
    let store = test_store().await;
    let orch = orchestrator(
        store.clone(),
        registry(vec![MockAdapter::slow(
            "slow",
            std::time::Duration::from_millis(300),
        )]),
    );
    let scheduler = Scheduler::new(
        orch.clone(),
        store,
        parse_schedule_times("09:00,09:01").unwrap(),
        90,
    );

    // Both slots are due; the first occupies the orchestrator, the second
    // is skipped as Busy and stays unfired.
    let fired = scheduler.check_slots(at(test_date(), 9, 30)).await.unwrap();
    assert_eq!(fired.len(), 1);
    wait_for_terminal(&orch, fired[0]).await;

    // Next tick: the deferred slot fires now that the gate is open.
    let deferred = scheduler.check_slots(at(test_date(), 9, 31)).await.unwrap();
    assert_eq!(deferred.len(), 1);
}
