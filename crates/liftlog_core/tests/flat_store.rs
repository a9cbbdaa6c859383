use liftlog_core::store::RowFilter;
use liftlog_core::{CollectionKind, FlatStore, PerformedSet, ProfileId, StoreError};

fn setup() -> FlatStore {
    FlatStore::open_in_memory().unwrap()
}

#[test]
fn write_commits_on_ok_and_counts_scopes() {
    let store = setup();
    let profile_id = ProfileId::new();
    let set = PerformedSet::new(profile_id, 5, 100.0);

    assert_eq!(store.write_scope_count(), 0);
    store
        .write(|tx| tx.records::<PerformedSet>().put(&set))
        .unwrap();

    assert_eq!(store.write_scope_count(), 1);
    assert!(!store.in_write_scope());
    assert_eq!(store.records::<PerformedSet>().get(set.id).unwrap(), Some(set));
}

#[test]
fn write_rolls_back_on_err() {
    let store = setup();
    let set = PerformedSet::new(ProfileId::new(), 8, 60.0);

    let result: Result<(), StoreError> = store.write(|tx| {
        tx.records::<PerformedSet>().put(&set)?;
        Err(StoreError::MissingCollection("forced"))
    });

    assert!(matches!(result, Err(StoreError::MissingCollection("forced"))));
    assert_eq!(store.records::<PerformedSet>().get(set.id).unwrap(), None);
    assert!(!store.in_write_scope());
}

#[test]
fn nested_write_is_rejected_without_touching_outer_scope() {
    let store = setup();
    let set = PerformedSet::new(ProfileId::new(), 3, 140.0);

    store
        .write(|tx| {
            tx.records::<PerformedSet>().put(&set)?;
            let nested: Result<(), StoreError> = store.write(|_| Ok(()));
            assert!(matches!(nested, Err(StoreError::NestedWriteScope)));
            Ok::<_, StoreError>(())
        })
        .unwrap();

    assert_eq!(store.write_scope_count(), 1);
    assert!(store.records::<PerformedSet>().get(set.id).unwrap().is_some());
}

#[test]
fn reads_inside_scope_see_uncommitted_writes() {
    let store = setup();
    let set = PerformedSet::new(ProfileId::new(), 10, 40.0);

    store
        .write(|tx| {
            tx.records::<PerformedSet>().put(&set)?;
            assert!(store.in_write_scope());
            assert!(store.records::<PerformedSet>().get(set.id)?.is_some());
            Ok::<_, StoreError>(())
        })
        .unwrap();
}

#[test]
fn bulk_get_is_aligned_with_input() {
    let store = setup();
    let profile_id = ProfileId::new();
    let first = PerformedSet::new(profile_id, 5, 100.0);
    let second = PerformedSet::new(profile_id, 5, 105.0);
    store
        .write(|tx| {
            let sets = tx.records::<PerformedSet>();
            sets.put(&first)?;
            sets.put(&second)
        })
        .unwrap();

    let ids = vec![
        second.id.to_string(),
        "missing".to_string(),
        first.id.to_string(),
    ];
    let rows = store
        .collection(CollectionKind::PerformedSets)
        .bulk_get(&ids)
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].as_ref().map(|row| row.id.clone()), Some(ids[0].clone()));
    assert!(rows[1].is_none());
    assert_eq!(rows[2].as_ref().map(|row| row.id.clone()), Some(ids[2].clone()));
}

#[test]
fn bulk_get_splits_large_batches() {
    let store = setup();
    let profile_id = ProfileId::new();
    let sets: Vec<PerformedSet> = (0..1_200)
        .map(|reps| PerformedSet::new(profile_id, reps, 20.0))
        .collect();
    store
        .write(|tx| {
            let records = tx.records::<PerformedSet>();
            for set in &sets {
                records.put(set)?;
            }
            Ok::<_, StoreError>(())
        })
        .unwrap();

    let ids: Vec<_> = sets.iter().map(|set| set.id).collect();
    let found = store.records::<PerformedSet>().bulk_get(&ids).unwrap();
    assert_eq!(found.len(), 1_200);
    assert!(found.iter().all(Option::is_some));
    assert_eq!(
        store.records::<PerformedSet>().count_existing(&ids).unwrap(),
        1_200
    );
}

#[test]
fn put_is_an_upsert() {
    let store = setup();
    let mut set = PerformedSet::new(ProfileId::new(), 5, 100.0);
    store
        .write(|tx| tx.records::<PerformedSet>().put(&set))
        .unwrap();
    set.complete(6, 100.0, Some(8.0));
    store
        .write(|tx| tx.records::<PerformedSet>().put(&set))
        .unwrap();

    let collection = store.collection(CollectionKind::PerformedSets);
    assert_eq!(collection.query(RowFilter::all()).count().unwrap(), 1);
    assert_eq!(store.records::<PerformedSet>().get(set.id).unwrap(), Some(set));
}

#[test]
fn query_filters_by_profile_and_json_fields() {
    let store = setup();
    let mine = ProfileId::new();
    let theirs = ProfileId::new();
    store
        .write(|tx| {
            let workouts = tx.collection(CollectionKind::WorkoutLogs);
            workouts.put("w1", &mine.to_string(), r#"{"start_time": 10, "end_time": null}"#)?;
            workouts.put("w2", &mine.to_string(), r#"{"start_time": 50, "end_time": 60}"#)?;
            workouts.put("w3", &theirs.to_string(), r#"{"start_time": 5}"#)
        })
        .unwrap();

    let workouts = store.collection(CollectionKind::WorkoutLogs);
    assert_eq!(
        workouts
            .query(RowFilter::for_profile(mine))
            .fetch_ids()
            .unwrap(),
        vec!["w1", "w2"]
    );
    assert_eq!(
        workouts
            .query(RowFilter::all().field_lt("$.start_time", 20))
            .fetch_ids()
            .unwrap(),
        vec!["w1", "w3"]
    );
    assert_eq!(
        workouts
            .query(RowFilter::all().field_is_null("$.end_time"))
            .fetch_ids()
            .unwrap(),
        vec!["w1", "w3"]
    );
    assert_eq!(
        workouts.query(RowFilter::all().limit(2)).count().unwrap(),
        2
    );
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let store = setup();
    let set = PerformedSet::new(ProfileId::new(), 1, 200.0);
    store
        .write(|tx| tx.records::<PerformedSet>().put(&set))
        .unwrap();

    let removed = store
        .write(|tx| tx.records::<PerformedSet>().delete(set.id))
        .unwrap();
    let removed_again = store
        .write(|tx| tx.records::<PerformedSet>().delete(set.id))
        .unwrap();

    assert!(removed);
    assert!(!removed_again);
}

#[test]
fn undecodable_body_is_a_codec_error() {
    let store = setup();
    let id = liftlog_core::SetId::new();
    store
        .write(|tx| {
            tx.collection(CollectionKind::PerformedSets).put(
                &id.to_string(),
                &ProfileId::new().to_string(),
                r#"{"reps": "many"}"#,
            )
        })
        .unwrap();

    assert!(matches!(
        store.records::<PerformedSet>().get(id),
        Err(StoreError::Codec { .. })
    ));
}
