// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout store lifecycle tests.
//!
//! These cover the durable change-tracking core: additions, field diffs,
//! movements, replacement deletions, completed-workout retention across
//! rolling-window exits, idempotence, and corrupt-file recovery.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use tp_sync::db::WorkoutStore;
use tp_sync::models::{
    DeletionType, ExecutionStatus, HistoryAction, Source, StravaMetrics, Workout,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

fn store_in(dir: &TempDir) -> WorkoutStore {
    WorkoutStore::load(dir.path().join("workouts_TEST.json"))
}

fn planned_workout(uid: &str, summary: &str, date: NaiveDate) -> Workout {
    Workout {
        uid: uid.to_string(),
        summary: summary.to_string(),
        start_date: Some(date),
        is_all_day: true,
        ..Default::default()
    }
}

fn timed_workout(uid: &str, summary: &str, start: DateTime<Utc>) -> Workout {
    Workout {
        uid: uid.to_string(),
        summary: summary.to_string(),
        start_time: Some(start),
        start_date: Some(start.date_naive()),
        has_time: true,
        ..Default::default()
    }
}

fn as_map(workouts: Vec<Workout>) -> BTreeMap<String, Workout> {
    workouts.into_iter().map(|w| (w.uid.clone(), w)).collect()
}

#[test]
fn test_first_update_adds_everything() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    let changes = store
        .update(
            &as_map(vec![
                planned_workout("tp1", "Run", date),
                planned_workout("tp2", "Bike", date),
            ]),
            now(),
        )
        .unwrap();

    assert_eq!(changes.additions.len(), 2);
    assert!(changes.modifications.is_empty());
    assert!(changes.deletions.is_empty());
    assert_eq!(store.current_workouts().len(), 2);

    let record = store.record("tp1").unwrap();
    assert_eq!(record.history.len(), 1);
    assert_eq!(record.history[0].action, HistoryAction::Added);
}

#[test]
fn test_update_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    let input = as_map(vec![planned_workout("tp1", "Run", date)]);

    store.update(&input, now()).unwrap();
    let second = store.update(&input, now()).unwrap();

    assert!(second.is_empty());
    // No spurious history either
    assert_eq!(store.record("tp1").unwrap().history.len(), 1);
    // And no empty entries in the change log
    assert_eq!(store.change_log(None).len(), 1);
}

#[test]
fn test_modification_records_diff_and_movement() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let start = Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap();
    store
        .update(&as_map(vec![timed_workout("tp1", "Run", start)]), now())
        .unwrap();

    let moved = Utc.with_ymd_and_hms(2024, 1, 16, 10, 30, 0).unwrap();
    let changes = store
        .update(&as_map(vec![timed_workout("tp1", "Run", moved)]), now())
        .unwrap();

    assert_eq!(changes.modifications.len(), 1);
    let modification = &changes.modifications[0];
    assert!(modification.changes.contains_key("start_time"));

    assert_eq!(changes.movements.len(), 1);
    assert_eq!(changes.movements[0].old_start, Some(start));
    assert_eq!(changes.movements[0].new_start, Some(moved));

    let record = store.record("tp1").unwrap();
    assert_eq!(record.history.len(), 2);
    assert_eq!(record.history[1].action, HistoryAction::Modified);
}

#[test]
fn test_non_time_modification_is_not_a_movement() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    store
        .update(&as_map(vec![planned_workout("tp1", "Run", date)]), now())
        .unwrap();

    let changes = store
        .update(
            &as_map(vec![planned_workout("tp1", "Long Run", date)]),
            now(),
        )
        .unwrap();

    assert_eq!(changes.modifications.len(), 1);
    assert!(changes.movements.is_empty());
}

#[test]
fn test_replacement_flow() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    // Cycle 1: planned calendar run
    let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let mut tp1 = timed_workout("tp1", "Morning Run", start);
    tp1.source = Some(Source::TrainingPeaks);
    tp1.parsed_execution_status = Some(ExecutionStatus::Planned);
    store.update(&as_map(vec![tp1]), now()).unwrap();

    // Cycle 2: Strava reported the executed run, reconciler matched it
    let strava_start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();
    let strava = Workout {
        source: Some(Source::Strava),
        parsed_execution_status: Some(ExecutionStatus::Completed),
        status: Some("COMPLETED".to_string()),
        replaced_tp_uid: Some("tp1".to_string()),
        strava: StravaMetrics {
            distance: Some(10000.0),
            ..Default::default()
        },
        ..timed_workout("strava_999", "Morning Run", strava_start)
    };
    let changes = store.update(&as_map(vec![strava]), now()).unwrap();

    // strava_999 added, tp1 deleted as replaced
    assert_eq!(changes.additions.len(), 1);
    assert_eq!(changes.additions[0].uid, "strava_999");
    assert_eq!(changes.deletions.len(), 1);
    assert_eq!(changes.deletions[0].uid, "tp1");
    assert_eq!(
        changes.deletions[0].reason.as_deref(),
        Some("replaced_by_strava")
    );

    let tp1_record = store.record("tp1").unwrap();
    assert_eq!(tp1_record.current, None);
    let last = tp1_record.history.last().unwrap();
    assert_eq!(last.action, HistoryAction::Deleted);
    assert_eq!(last.replaced_by.as_deref(), Some("strava_999"));

    let current = store.current_workouts();
    assert!(current.contains_key("strava_999"));
    assert!(!current.contains_key("tp1"));
}

#[test]
fn test_replacement_is_idempotent_across_refreshes() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    store
        .update(&as_map(vec![timed_workout("tp1", "Run", start)]), now())
        .unwrap();

    let strava = Workout {
        replaced_tp_uid: Some("tp1".to_string()),
        source: Some(Source::Strava),
        ..timed_workout("strava_999", "Run", start)
    };
    store.update(&as_map(vec![strava.clone()]), now()).unwrap();

    let history_len = store.record("tp1").unwrap().history.len();
    let changes = store.update(&as_map(vec![strava]), now()).unwrap();

    // The replaced entry is already gone; nothing new to record
    assert!(changes.is_empty());
    assert_eq!(store.record("tp1").unwrap().history.len(), history_len);
}

#[test]
fn test_completed_workout_survives_rolling_window_exit() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    // Completed 8 days ago
    let start = Utc.with_ymd_and_hms(2024, 1, 7, 9, 0, 0).unwrap();
    let mut done = timed_workout("tp_old", "Long Ride", start);
    done.parsed_execution_status = Some(ExecutionStatus::Completed);
    store.update(&as_map(vec![done.clone()]), now()).unwrap();

    // Next refresh: the feed window no longer includes it
    let changes = store.update(&BTreeMap::new(), now()).unwrap();

    assert!(changes.is_empty());
    let current = store.current_workouts();
    assert_eq!(current.get("tp_old"), Some(&done));
    // No deletion entry in history either
    assert_eq!(store.record("tp_old").unwrap().history.len(), 1);
}

#[test]
fn test_planned_workout_disappearance_is_classified() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    // Planned 4 days ago, never executed
    let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
    store
        .update(&as_map(vec![planned_workout("tp1", "Run", date)]), now())
        .unwrap();

    let changes = store.update(&BTreeMap::new(), now()).unwrap();

    assert_eq!(changes.deletions.len(), 1);
    let deletion = &changes.deletions[0];
    assert_eq!(deletion.uid, "tp1");
    assert_eq!(
        deletion.deletion_type,
        Some(DeletionType::NotExecutedAgedOut)
    );
    assert!(deletion.workout.is_some());

    let record = store.record("tp1").unwrap();
    assert_eq!(record.current, None);
    assert_eq!(
        record.history.last().unwrap().deletion_type,
        Some(DeletionType::NotExecutedAgedOut)
    );
}

#[test]
fn test_future_workout_disappearance_is_deliberate() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
    store
        .update(&as_map(vec![planned_workout("tp1", "Run", date)]), now())
        .unwrap();

    let changes = store.update(&BTreeMap::new(), now()).unwrap();
    assert_eq!(
        changes.deletions[0].deletion_type,
        Some(DeletionType::DeletedFuture)
    );
}

#[test]
fn test_readded_uid_keeps_history() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
    let workout = planned_workout("tp1", "Run", date);

    store.update(&as_map(vec![workout.clone()]), now()).unwrap();
    store.update(&BTreeMap::new(), now()).unwrap();
    store.update(&as_map(vec![workout]), now()).unwrap();

    let record = store.record("tp1").unwrap();
    assert!(record.current.is_some());
    // added, deleted, added again - nothing pruned
    assert_eq!(record.history.len(), 3);
    assert_eq!(record.history[0].action, HistoryAction::Added);
    assert_eq!(record.history[1].action, HistoryAction::Deleted);
    assert_eq!(record.history[2].action, HistoryAction::Added);
}

#[test]
fn test_store_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workouts_TEST.json");

    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    {
        let mut store = WorkoutStore::load(&path);
        store
            .update(&as_map(vec![planned_workout("tp1", "Run", date)]), now())
            .unwrap();
    }

    let reloaded = WorkoutStore::load(&path);
    assert_eq!(reloaded.last_updated(), Some(now()));
    assert_eq!(reloaded.current_workouts().len(), 1);
    assert_eq!(reloaded.change_log(None).len(), 1);
    assert_eq!(
        reloaded.record("tp1").unwrap().history[0].action,
        HistoryAction::Added
    );
}

#[test]
fn test_corrupt_store_reinitializes_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workouts_TEST.json");
    std::fs::write(&path, "{not valid json").unwrap();

    let mut store = WorkoutStore::load(&path);
    assert!(store.current_workouts().is_empty());

    // And it is usable again afterwards
    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    let changes = store
        .update(&as_map(vec![planned_workout("tp1", "Run", date)]), now())
        .unwrap();
    assert_eq!(changes.additions.len(), 1);
}

#[test]
fn test_change_log_limit_returns_newest() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);

    let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    for i in 0..5 {
        let summary = format!("Run v{}", i);
        store
            .update(
                &as_map(vec![planned_workout("tp1", &summary, date)]),
                now() + chrono::Duration::minutes(i),
            )
            .unwrap();
    }

    assert_eq!(store.change_log(None).len(), 5);
    let last_two = store.change_log(Some(2));
    assert_eq!(last_two.len(), 2);
    assert_eq!(last_two[1].timestamp, now() + chrono::Duration::minutes(4));
}
