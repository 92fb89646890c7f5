mod common;

use common::{activity, at, day, insert_all};
use chrono::{NaiveDate, TimeZone, Utc};
use timeline_core::db::open_db_in_memory;
use timeline_core::{
    ActivityGroup, ActivityRecord, RecordRef, SqliteTimelineStore, StoreError, TimelineDay,
    TimelineStore, ValidationError,
};
use uuid::Uuid;

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();

    let mut record = activity("crm", (9, 0), (9, 5));
    record.client_id = Some(Uuid::new_v4());
    store.insert_activity(&record).unwrap();

    let loaded = store.get_activity(record.id).unwrap().unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.domain, "crm.example.test");
    assert!(store.get_activity(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn insert_rejects_negative_duration() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();

    let mut record = activity("crm", (9, 0), (9, 5));
    record.duration_seconds = -1;
    assert!(matches!(
        store.insert_activity(&record).unwrap_err(),
        StoreError::Validation(ValidationError::NegativeDuration { .. })
    ));
}

#[test]
fn list_activities_is_bounded_by_day_and_hidden_flag() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();

    let late = activity("late", (15, 0), (15, 30));
    let early = activity("early", (8, 0), (8, 30));
    let mut hidden = activity("hidden", (10, 0), (10, 5));
    hidden.hidden = true;
    let yesterday = ActivityRecord::new(
        "https://old.test",
        "old",
        Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap(),
        600,
        "extension",
    );
    insert_all(&store, &[late.clone(), early.clone(), hidden.clone(), yesterday]);

    let visible: Vec<_> = store
        .list_activities(&day(), false)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(visible, vec![early.id, late.id]);

    let all: Vec<_> = store
        .list_activities(&day(), true)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(all, vec![early.id, hidden.id, late.id]);
}

#[test]
fn utc_offset_moves_the_day_window() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();

    // 02:00 UTC on March 2 is still March 1 at UTC-05:00.
    let night = ActivityRecord::new("https://n.test", "n", at(2, 0), 60, "extension");
    store.insert_activity(&night).unwrap();

    let march_1_east_coast =
        TimelineDay::with_offset_minutes(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), -300)
            .unwrap();
    assert_eq!(store.list_activities(&march_1_east_coast, true).unwrap().len(), 1);
    let march_2_east_coast = TimelineDay::with_offset_minutes(common::date(), -300).unwrap();
    assert!(store.list_activities(&march_2_east_coast, true).unwrap().is_empty());
}

#[test]
fn create_group_links_members_in_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();
    let a = activity("a", (9, 0), (9, 5));
    let b = activity("b", (9, 30), (9, 40));
    insert_all(&store, &[a.clone(), b.clone()]);

    let group = ActivityGroup::new(vec![b.id, a.id]).unwrap();
    store.create_group(&group).unwrap();

    let resolved = store.get_group(group.id).unwrap().unwrap();
    assert_eq!(resolved.group.member_ids, vec![b.id, a.id]);
    let member_ids: Vec<_> = resolved.members.iter().map(|m| m.id).collect();
    assert_eq!(member_ids, vec![b.id, a.id]);
    assert!(resolved.members.iter().all(|m| m.group_id == Some(group.id)));

    let listed = store.list_groups(&day()).unwrap();
    assert_eq!(listed, vec![resolved]);
}

#[test]
fn create_group_rolls_back_when_a_member_is_taken() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();
    let a = activity("a", (9, 0), (9, 5));
    let b = activity("b", (9, 10), (9, 15));
    let c = activity("c", (9, 20), (9, 25));
    insert_all(&store, &[a.clone(), b.clone(), c.clone()]);

    let first = ActivityGroup::new(vec![a.id, b.id]).unwrap();
    store.create_group(&first).unwrap();

    let second = ActivityGroup::new(vec![c.id, a.id]).unwrap();
    match store.create_group(&second).unwrap_err() {
        StoreError::AlreadyGrouped {
            activity_id,
            group_id,
        } => {
            assert_eq!(activity_id, a.id);
            assert_eq!(group_id, first.id);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(store.get_group(second.id).unwrap().is_none());
    assert_eq!(store.get_activity(c.id).unwrap().unwrap().group_id, None);
}

#[test]
fn create_group_with_unknown_member_leaves_no_group_row() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();
    let a = activity("a", (9, 0), (9, 5));
    store.insert_activity(&a).unwrap();

    let ghost = Uuid::new_v4();
    let group = ActivityGroup::new(vec![a.id, ghost]).unwrap();
    match store.create_group(&group).unwrap_err() {
        StoreError::NotFound(target) => assert_eq!(target, RecordRef::Activity(ghost)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.get_group(group.id).unwrap().is_none());
    assert_eq!(store.get_activity(a.id).unwrap().unwrap().group_id, None);
}

#[test]
fn delete_group_unlinks_members() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();
    let a = activity("a", (9, 0), (9, 5));
    let b = activity("b", (9, 10), (9, 15));
    insert_all(&store, &[a.clone(), b.clone()]);
    let group = ActivityGroup::new(vec![a.id, b.id]).unwrap();
    store.create_group(&group).unwrap();

    store.delete_group(group.id).unwrap();

    assert!(store.get_group(group.id).unwrap().is_none());
    assert_eq!(store.get_activity(a.id).unwrap().unwrap(), a);
    assert_eq!(store.get_activity(b.id).unwrap().unwrap(), b);
    assert!(matches!(
        store.delete_group(group.id).unwrap_err(),
        StoreError::NotFound(RecordRef::Group(_))
    ));
}

#[test]
fn hidden_update_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();
    let a = activity("a", (9, 0), (9, 5));
    store.insert_activity(&a).unwrap();

    let err = store
        .update_activity_hidden(&[a.id, Uuid::new_v4()], true)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(RecordRef::Activity(_))));
    assert!(!store.get_activity(a.id).unwrap().unwrap().hidden);

    store.update_activity_hidden(&[a.id], true).unwrap();
    assert!(store.get_activity(a.id).unwrap().unwrap().hidden);
}

#[test]
fn client_updates_report_missing_targets() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTimelineStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.update_activity_client(Uuid::new_v4(), None).unwrap_err(),
        StoreError::NotFound(RecordRef::Activity(_))
    ));
    assert!(matches!(
        store
            .update_group_client(Uuid::new_v4(), Some(Uuid::new_v4()))
            .unwrap_err(),
        StoreError::NotFound(RecordRef::Group(_))
    ));
}
