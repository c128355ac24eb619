use things_sync::{Command, CommandRejected, Provider, Store};

use crate::support::{ada, two_rows, Harness, TABLE};

#[test]
fn create_requires_sign_in() {
    let mut harness = Harness::started(two_rows());

    assert_eq!(
        harness.app.create_thing(),
        Err(CommandRejected::NotSignedIn("create a thing"))
    );
    harness.settle();
    assert_eq!(harness.backend.write_count(), 0);
    assert_eq!(harness.app.in_flight(), 0);
}

#[test]
fn created_thing_arrives_through_the_feed() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    harness.app.create_thing().unwrap();
    // the write is in flight; caches have not changed yet
    assert_eq!(harness.app.shared().len(), 2);
    harness.settle();

    assert_eq!(harness.backend.write_count(), 1);
    assert_eq!(harness.app.shared().len(), 3);
    assert_eq!(harness.app.owned().len(), 2);

    let created = harness
        .backend
        .rows(TABLE)
        .into_iter()
        .find(|thing| thing.id == 3)
        .unwrap();
    assert_eq!(created.owner, ada().id);
    assert!(created.weight <= 100);
    assert_eq!(harness.app.owned().get(3), Some(&created));
}

#[test]
fn delete_own_thing() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    harness.app.delete_thing(1).unwrap();
    harness.settle();

    assert!(harness.app.owned().is_empty());
    assert_eq!(harness.shared_names(), vec!["B"]);
    assert!(harness.backend.fetch_all(TABLE, None).unwrap().iter().all(|t| t.id != 1));
}

#[test]
fn delete_of_another_users_thing_is_rejected() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    assert_eq!(
        harness.app.delete_thing(2),
        Err(CommandRejected::NotOwner { id: 2 })
    );
    harness.settle();
    assert_eq!(harness.backend.write_count(), 0);
    assert_eq!(harness.app.shared().len(), 2);
}

#[test]
fn delete_of_unknown_thing_is_rejected() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    assert_eq!(
        harness.app.delete_thing(404),
        Err(CommandRejected::UnknownThing(404))
    );
    assert_eq!(harness.backend.write_count(), 0);
}

#[test]
fn delete_requires_sign_in() {
    let mut harness = Harness::started(two_rows());
    assert_eq!(
        harness.app.delete_thing(1),
        Err(CommandRejected::NotSignedIn("delete a thing"))
    );
    assert_eq!(harness.backend.write_count(), 0);
}

#[test]
fn failed_write_does_not_touch_caches() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);
    harness.backend.set_unreachable(true);

    harness.app.create_thing().unwrap();
    harness.settle();

    assert_eq!(harness.app.shared().len(), 2);
    assert_eq!(harness.app.owned().len(), 1);
    assert_eq!(harness.backend.write_count(), 0);
}

#[test]
fn command_values_describe_the_write() {
    let command = Command::Delete(7);
    assert_eq!(format!("{:?}", command), "Delete(7)");
}
