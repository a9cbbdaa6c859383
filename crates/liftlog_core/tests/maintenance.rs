use liftlog_core::service::maintenance::{IntegrityIssue, MaintenancePhase};
use liftlog_core::store::RowFilter;
use liftlog_core::{
    AggregateRepository, BulkDeleteOutcome, BulkDeleteRequest, CancellationToken, CollectionKind,
    Document, ExerciseId, FlatStore, GroupType, MaintenanceCategory, MaintenanceConfig,
    MaintenanceEngine, MaintenanceError, MaintenanceProgress, PerformedExerciseLog,
    PerformedGroupLog, PerformedSet, ProfileId, Repositories, StoreError, WorkoutLog, WorkoutLogId,
};
use serde_json::json;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const NOW_MS: i64 = 1_000 * DAY_MS;

fn setup() -> FlatStore {
    FlatStore::open_in_memory().unwrap()
}

fn engine(store: &FlatStore, chunk_size: usize) -> MaintenanceEngine<'_> {
    MaintenanceEngine::new(
        store,
        MaintenanceConfig {
            chunk_size,
            ..MaintenanceConfig::default()
        },
    )
    .unwrap()
}

fn row_count(store: &FlatStore, kind: CollectionKind) -> usize {
    store.collection(kind).query(RowFilter::all()).count().unwrap()
}

fn seed_documents(store: &FlatStore, kind: CollectionKind, profile_id: ProfileId, count: usize) {
    let documents = Repositories::new(store).documents(kind).unwrap();
    for index in 0..count {
        documents
            .save(Document::new(profile_id, json!({ "index": index })))
            .unwrap();
    }
}

fn workout_at(profile_id: ProfileId, start_time: i64) -> WorkoutLog {
    let mut exercise = PerformedExerciseLog::new(profile_id, ExerciseId::new());
    exercise.add_set(PerformedSet::new(profile_id, 8, 60.0));
    let mut group = PerformedGroupLog::new(profile_id, GroupType::Single, 90);
    group.add_exercise(exercise);
    let mut workout = WorkoutLog::start(profile_id, "Session", start_time);
    workout.add_group(group);
    workout
}

fn run(
    engine: &MaintenanceEngine<'_>,
    request: &BulkDeleteRequest,
) -> (BulkDeleteOutcome, Vec<MaintenanceProgress>) {
    let mut snapshots = Vec::new();
    let mut on_progress = |progress: &MaintenanceProgress| snapshots.push(progress.clone());
    let outcome = engine.bulk_delete(request, Some(&mut on_progress)).unwrap();
    (outcome, snapshots)
}

#[test]
fn all_over_25_profiles_runs_one_chunk() {
    let store = setup();
    seed_documents(&store, CollectionKind::Profiles, ProfileId::new(), 25);
    let engine = engine(&store, 50);

    let (outcome, snapshots) = run(
        &engine,
        &BulkDeleteRequest::new(MaintenanceCategory::All).at(NOW_MS),
    );

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].overall_progress, 1.0);
    assert_eq!(snapshots[0].items_processed, 25);
    assert_eq!(outcome.total_deleted, 25);
    assert!(outcome.errors.is_empty());
    assert!(!outcome.cancelled);
    assert_eq!(outcome.final_progress.phase, MaintenancePhase::Completed);
    assert_eq!(row_count(&store, CollectionKind::Profiles), 0);
}

#[test]
fn progress_is_monotonic_and_fires_once_per_chunk() {
    let store = setup();
    seed_documents(&store, CollectionKind::Exercises, ProfileId::new(), 7);
    let engine = engine(&store, 3);

    let (outcome, snapshots) = run(
        &engine,
        &BulkDeleteRequest::new(MaintenanceCategory::Exercises),
    );

    assert_eq!(snapshots.len(), 3);
    let processed: Vec<usize> = snapshots.iter().map(|s| s.items_processed).collect();
    assert_eq!(processed, vec![3, 6, 7]);
    assert!(snapshots
        .windows(2)
        .all(|pair| pair[0].overall_progress <= pair[1].overall_progress));
    assert_eq!(snapshots.last().unwrap().overall_progress, 1.0);
    assert_eq!(snapshots.last().unwrap().category_progress, 1.0);
    assert!(snapshots
        .iter()
        .all(|s| s.current_category == Some(MaintenanceCategory::Exercises)));
    assert_eq!(outcome.total_deleted, 7);
}

#[test]
fn failing_category_is_recorded_and_others_continue() {
    let store = setup();
    let repos = Repositories::new(&store);
    let profile_id = ProfileId::new();
    repos.workouts().save(workout_at(profile_id, NOW_MS)).unwrap();
    repos.workouts().save(workout_at(profile_id, NOW_MS)).unwrap();
    store
        .write(|tx| {
            tx.collection(CollectionKind::WorkoutLogs).put(
                &WorkoutLogId::new().to_string(),
                &profile_id.to_string(),
                r#"{"unexpected": true}"#,
            )
        })
        .unwrap();
    seed_documents(&store, CollectionKind::Profiles, profile_id, 2);
    seed_documents(&store, CollectionKind::MaxLogs, profile_id, 4);
    let engine = engine(&store, 50);

    let (outcome, snapshots) = run(
        &engine,
        &BulkDeleteRequest::new(MaintenanceCategory::All).at(NOW_MS),
    );

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].category, MaintenanceCategory::WorkoutLogs);
    assert_eq!(outcome.errors[0].items_skipped, 3);
    assert_eq!(outcome.total_deleted, 6);
    assert_eq!(
        outcome.deleted_by_category.get(&MaintenanceCategory::WorkoutLogs),
        Some(&0)
    );
    assert_eq!(row_count(&store, CollectionKind::WorkoutLogs), 3);
    assert_eq!(row_count(&store, CollectionKind::Profiles), 0);
    assert_eq!(row_count(&store, CollectionKind::MaxLogs), 0);
    assert_eq!(snapshots.last().unwrap().overall_progress, 1.0);
    assert_eq!(outcome.final_progress.items_skipped, 3);
}

#[test]
fn earlier_chunks_stay_committed_when_a_later_chunk_fails() {
    let store = setup();
    let repos = Repositories::new(&store);
    let profile_id = ProfileId::new();
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(repos.workouts().save(workout_at(profile_id, NOW_MS)).unwrap().id);
    }
    // Sorts after every UUID, so it lands in the last chunk.
    store
        .write(|tx| {
            tx.collection(CollectionKind::WorkoutLogs).put(
                "zzzz-corrupt",
                &profile_id.to_string(),
                "{}",
            )
        })
        .unwrap();
    let engine = engine(&store, 2);

    let (outcome, snapshots) = run(
        &engine,
        &BulkDeleteRequest::new(MaintenanceCategory::WorkoutLogs),
    );

    assert_eq!(outcome.total_deleted, 4);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].items_skipped, 1);
    assert_eq!(snapshots.len(), 3);
    assert_eq!(row_count(&store, CollectionKind::WorkoutLogs), 1);
    assert_eq!(row_count(&store, CollectionKind::PerformedSets), 0);
}

#[test]
fn cancellation_stops_between_chunks() {
    let store = setup();
    seed_documents(&store, CollectionKind::TrainingPlans, ProfileId::new(), 10);
    let engine = engine(&store, 4);
    let token = CancellationToken::new();
    let request = BulkDeleteRequest::new(MaintenanceCategory::TrainingPlans)
        .with_cancellation(token.clone());

    let mut callbacks = 0;
    let mut on_progress = |_: &MaintenanceProgress| {
        callbacks += 1;
        token.cancel();
    };
    let outcome = engine.bulk_delete(&request, Some(&mut on_progress)).unwrap();

    assert_eq!(callbacks, 1);
    assert!(outcome.cancelled);
    assert_eq!(outcome.total_deleted, 4);
    assert_eq!(outcome.final_progress.phase, MaintenancePhase::Cancelled);
    assert_eq!(row_count(&store, CollectionKind::TrainingPlans), 6);
}

#[test]
fn orphaned_data_removes_unreferenced_children_only() {
    let store = setup();
    let repos = Repositories::new(&store);
    let profile_id = ProfileId::new();
    let kept = repos.workouts().save(workout_at(profile_id, NOW_MS)).unwrap();

    let mut orphan_exercise = PerformedExerciseLog::new(profile_id, ExerciseId::new());
    orphan_exercise.add_set(PerformedSet::new(profile_id, 3, 180.0));
    let mut orphan_group = PerformedGroupLog::new(profile_id, GroupType::Superset, 60);
    orphan_group.add_exercise(orphan_exercise);
    repos.groups().save(orphan_group).unwrap();
    repos.sets().save(PerformedSet::new(profile_id, 1, 20.0)).unwrap();

    let (outcome, _) = run(
        &engine(&store, 50),
        &BulkDeleteRequest::new(MaintenanceCategory::OrphanedData),
    );

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.total_deleted, 2);
    assert_eq!(row_count(&store, CollectionKind::GroupLogs), 1);
    assert_eq!(row_count(&store, CollectionKind::ExerciseLogs), 1);
    assert_eq!(row_count(&store, CollectionKind::PerformedSets), 1);
    assert_eq!(
        repos.workouts().find_by_id(kept.id).unwrap().unwrap(),
        kept
    );
}

#[test]
fn old_workout_logs_respect_retention() {
    let store = setup();
    let repos = Repositories::new(&store);
    let profile_id = ProfileId::new();
    let old = repos
        .workouts()
        .save(workout_at(profile_id, NOW_MS - 400 * DAY_MS))
        .unwrap();
    let recent = repos
        .workouts()
        .save(workout_at(profile_id, NOW_MS - DAY_MS))
        .unwrap();

    let (outcome, _) = run(
        &engine(&store, 50),
        &BulkDeleteRequest::new(MaintenanceCategory::OldWorkoutLogs).at(NOW_MS),
    );

    assert_eq!(outcome.total_deleted, 1);
    assert!(repos.workouts().find_by_id(old.id).unwrap().is_none());
    assert!(repos.workouts().find_by_id(recent.id).unwrap().is_some());
    assert_eq!(row_count(&store, CollectionKind::PerformedSets), 1);
}

#[test]
fn expired_sessions_only_touch_stale_unfinished_workouts() {
    let store = setup();
    let repos = Repositories::new(&store);
    let profile_id = ProfileId::new();
    let stale = repos
        .workouts()
        .save(workout_at(profile_id, NOW_MS - 2 * DAY_MS))
        .unwrap();
    let mut finished = workout_at(profile_id, NOW_MS - 2 * DAY_MS);
    finished.finish(NOW_MS - 2 * DAY_MS + 3_600_000).unwrap();
    let finished = repos.workouts().save(finished).unwrap();
    let in_progress = repos
        .workouts()
        .save(workout_at(profile_id, NOW_MS - 3_600_000))
        .unwrap();

    let (outcome, _) = run(
        &engine(&store, 50),
        &BulkDeleteRequest::new(MaintenanceCategory::ExpiredSessions).at(NOW_MS),
    );

    assert_eq!(outcome.total_deleted, 1);
    assert!(repos.workouts().find_by_id(stale.id).unwrap().is_none());
    assert!(repos.workouts().find_by_id(finished.id).unwrap().is_some());
    assert!(repos.workouts().find_by_id(in_progress.id).unwrap().is_some());
}

#[test]
fn profile_scope_limits_deletion() {
    let store = setup();
    let mine = ProfileId::new();
    let theirs = ProfileId::new();
    seed_documents(&store, CollectionKind::BodyWeights, mine, 2);
    seed_documents(&store, CollectionKind::BodyMeasurements, mine, 1);
    seed_documents(&store, CollectionKind::BodyWeights, theirs, 3);

    let (outcome, _) = run(
        &engine(&store, 50),
        &BulkDeleteRequest::new(MaintenanceCategory::BodyMetrics).for_profile(mine),
    );

    assert_eq!(outcome.total_deleted, 3);
    assert_eq!(row_count(&store, CollectionKind::BodyWeights), 3);
    assert_eq!(row_count(&store, CollectionKind::BodyMeasurements), 0);
}

#[test]
fn bulk_delete_refuses_to_start_inside_a_write_scope() {
    let store = setup();
    let engine = engine(&store, 50);

    let result: Result<(), StoreError> = store.write(|_| {
        let outcome = engine.bulk_delete(&BulkDeleteRequest::new(MaintenanceCategory::All), None);
        assert!(matches!(outcome, Err(MaintenanceError::WriteScopeOpen)));
        Ok(())
    });

    result.unwrap();
}

#[test]
fn zero_chunk_size_is_a_precondition_failure() {
    let store = setup();
    let config = MaintenanceConfig {
        chunk_size: 0,
        ..MaintenanceConfig::default()
    };

    assert!(matches!(
        MaintenanceEngine::new(&store, config),
        Err(MaintenanceError::InvalidConfig(_))
    ));
}

#[test]
fn integrity_of_a_clean_store() {
    let store = setup();
    let repos = Repositories::new(&store);
    repos.workouts().save(workout_at(ProfileId::new(), NOW_MS)).unwrap();

    let report = engine(&store, 50).validate_integrity().unwrap();

    assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    assert_eq!(report.sqlite_messages, vec!["ok".to_string()]);
    assert_eq!(report.rows_checked, 4);
}

#[test]
fn integrity_reports_structural_damage() {
    let store = setup();
    let repos = Repositories::new(&store);
    let workout = repos.workouts().save(workout_at(ProfileId::new(), NOW_MS)).unwrap();
    let group_id = workout.groups[0].id;
    let exercise_id = workout.groups[0].exercises[0].id;
    let corrupt_id = WorkoutLogId::new();
    store
        .write(|tx| {
            tx.collection(CollectionKind::GroupLogs)
                .delete(&group_id.to_string())?;
            tx.collection(CollectionKind::WorkoutLogs).put(
                &corrupt_id.to_string(),
                &workout.profile_id.to_string(),
                r#"{"unexpected": true}"#,
            )
        })
        .unwrap();

    let report = engine(&store, 50).validate_integrity().unwrap();

    assert!(!report.is_clean());
    assert!(report.issues.contains(&IntegrityIssue::DanglingReference {
        parent: CollectionKind::WorkoutLogs,
        parent_id: workout.id.to_string(),
        child: CollectionKind::GroupLogs,
        child_id: group_id.to_string(),
    }));
    assert!(report.issues.contains(&IntegrityIssue::OrphanedRow {
        collection: CollectionKind::ExerciseLogs,
        id: exercise_id.to_string(),
    }));
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::UndecodableRow { collection: CollectionKind::WorkoutLogs, id, .. }
            if *id == corrupt_id.to_string()
    )));
}

#[test]
fn integrity_reports_cross_profile_children() {
    let store = setup();
    let repos = Repositories::new(&store);
    let workout = repos.workouts().save(workout_at(ProfileId::new(), NOW_MS)).unwrap();
    let set_id = workout.groups[0].exercises[0].sets[0].id;
    store
        .connection()
        .execute(
            "UPDATE performed_sets SET profile_id = ?1 WHERE id = ?2;",
            [ProfileId::new().to_string(), set_id.to_string()],
        )
        .unwrap();

    let report = engine(&store, 50).validate_integrity().unwrap();

    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::CrossProfile { child: CollectionKind::PerformedSets, child_id, .. }
            if *child_id == set_id.to_string()
    )));
}

#[test]
fn optimize_reports_page_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlatStore::open(dir.path().join("optimize.db")).unwrap();
    seed_documents(&store, CollectionKind::Exercises, ProfileId::new(), 200);
    let engine = engine(&store, 50);
    engine
        .bulk_delete(&BulkDeleteRequest::new(MaintenanceCategory::Exercises), None)
        .unwrap();

    let report = engine.optimize().unwrap();

    assert!(report.page_size > 0);
    assert!(report.page_count_after > 0);
    assert!(report.page_count_after <= report.page_count_before);
    assert_eq!(report.freelist_count_after, 0);
}
