use things_sync::{AppEvent, CacheKind, ChangeEvent, NewThing, Store, Thing};

use crate::support::{ada, grace, two_rows, Harness, TABLE};

#[test]
fn shared_table_loads_heaviest_first() {
    let harness = Harness::started(two_rows());

    assert_eq!(harness.shared_names(), vec!["B", "A"]);
    let rows = &harness.app.view().shared_things.rows;
    assert_eq!(rows[0].weight_label(), "50 lbs.");
    assert!(rows.iter().all(|row| row.action.is_none()));
    assert_eq!(harness.app.open_subscriptions(), 1);
    assert_eq!(harness.backend.subscriber_count(), 1);
}

#[test]
fn delete_event_removes_row() {
    let mut harness = Harness::started(two_rows());

    harness.backend.delete_by_id(TABLE, 1).unwrap();
    harness.settle();

    assert!(!harness.app.shared().contains(1));
    assert_eq!(harness.shared_names(), vec!["B"]);
}

#[test]
fn updates_apply_in_feed_order() {
    let mut harness = Harness::started(two_rows());

    // delivered out of store order: the older state arrives last
    harness
        .backend
        .broadcast(TABLE, ChangeEvent::Update(Thing::new(1, "A v3", 90, ada().id)))
        .unwrap();
    harness
        .backend
        .broadcast(TABLE, ChangeEvent::Update(Thing::new(1, "A v2", 5, ada().id)))
        .unwrap();
    harness.settle();

    let thing = harness.app.shared().get(1).unwrap();
    assert_eq!(thing.name, "A v2");
    assert_eq!(thing.weight, 5);
    assert_eq!(harness.shared_names(), vec!["B", "A v2"]);
}

#[test]
fn writes_by_other_clients_are_merged() {
    let mut harness = Harness::started(two_rows());

    harness
        .backend
        .insert(TABLE, &NewThing::new("C", 30, grace().id))
        .unwrap();
    harness
        .backend
        .update(TABLE, Thing::new(1, "A", 70, ada().id))
        .unwrap();
    harness.settle();

    assert_eq!(harness.shared_names(), vec!["A", "B", "C"]);
}

#[test]
fn every_merge_rerenders() {
    let mut harness = Harness::started(two_rows());
    let before = harness.app.view().renders;

    harness
        .backend
        .insert(TABLE, &NewThing::new("C", 30, grace().id))
        .unwrap();
    harness.backend.delete_by_id(TABLE, 2).unwrap();
    harness.settle();

    assert_eq!(harness.app.view().renders, before + 2);
}

#[test]
fn equal_weights_are_all_shown() {
    let harness = Harness::started(vec![
        NewThing::new("X", 20, ada().id),
        NewThing::new("Y", 20, grace().id),
        NewThing::new("Z", 40, grace().id),
    ]);

    let names = harness.shared_names();
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], "Z");
    assert!(names.contains(&"X".to_string()));
    assert!(names.contains(&"Y".to_string()));
}

#[test]
fn unreachable_store_is_reported() {
    let mut harness = Harness::new(two_rows());
    harness.backend.set_unreachable(true);
    harness.app.start().unwrap();
    harness.settle();

    let view = harness.app.view();
    assert!(view.shared_things.is_empty());
    let error = view.shared_error.as_deref().unwrap();
    assert!(error.contains("shared"), "unexpected message: {}", error);
    assert!(error.contains("unreachable"), "unexpected message: {}", error);
    assert_eq!(harness.app.open_subscriptions(), 0);
    assert_eq!(harness.app.in_flight(), 0);
}

#[test]
fn render_is_stable_without_changes() {
    let mut harness = Harness::started(two_rows());
    let first = harness.app.view().shared_things.clone();
    harness.app.pump();
    assert_eq!(harness.app.view().shared_things, first);
    assert_eq!(
        harness.app.shared().render(things_sync::RowActions::None),
        first
    );
}

#[test]
fn registration_opens_with_the_snapshot() {
    let mut harness = Harness::new(two_rows());
    harness.app.start().unwrap();
    let generation = harness.app.shared().generation().unwrap();

    // handled before the worker's own result, which then arrives stale
    harness.app.handle(AppEvent::Fetched {
        target: CacheKind::Shared,
        generation,
        result: Ok(harness.backend.rows(TABLE)),
    });
    assert!(harness.app.shared().has_open_handle());
    assert_eq!(harness.backend.subscriber_count(), 1);

    harness
        .backend
        .insert(TABLE, &NewThing::new("C", 30, grace().id))
        .unwrap();
    harness.settle();
    harness.app.pump();

    assert_eq!(harness.shared_names(), vec!["B", "C", "A"]);
}

#[test]
fn raw_realtime_payloads_are_merged() {
    let mut harness = Harness::started(two_rows());

    harness
        .backend
        .broadcast_json(
            TABLE,
            r#"{"eventType":"UPDATE","new":{"id":1,"name":"A","weight":75,"owner":"user-ada"},"old":{"id":1}}"#,
        )
        .unwrap();
    harness
        .backend
        .broadcast_json(TABLE, r#"{"eventType":"DELETE","new":{},"old":{"id":2}}"#)
        .unwrap();
    harness.settle();

    assert_eq!(harness.shared_names(), vec!["A"]);
    assert_eq!(harness.app.shared().get(1).unwrap().weight, 75);
}
