use std::sync::Arc;

use things_sync::identity::{AuthCallback, AuthListener};
use things_sync::{
    App, AppEvent, AuthChange, AuthError, AuthEvent, ClientConfig, Error, Identity,
    InMemoryBackend, InMemoryIdentity, Panels, Provider, RowAction, User,
};

use crate::support::{ada, grace, two_rows, Harness, SETTLE, TABLE};

/// Delegates to an in-memory provider but refuses listener registration.
struct WithoutListeners(InMemoryIdentity);

impl Identity for WithoutListeners {
    fn current_user(&self) -> Result<Option<User>, AuthError> {
        self.0.current_user()
    }

    fn sign_in(&self, provider: Provider) -> Result<(), AuthError> {
        self.0.sign_in(provider)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.0.sign_out()
    }

    fn on_auth_state_change(&self, _callback: AuthCallback) -> Result<AuthListener, AuthError> {
        Err(AuthError::Provider("listener registry offline".into()))
    }
}

#[test]
fn starts_signed_out() {
    let harness = Harness::started(two_rows());
    let view = harness.app.view();

    assert_eq!(view.panels, Panels::signed_out());
    assert_eq!(view.user_details, None);
    assert!(view.owned_things.is_empty());
    assert!(harness.app.user().is_none());
}

#[test]
fn sign_in_shows_owned_things_with_delete_actions() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    let view = harness.app.view();
    assert_eq!(view.panels, Panels::signed_in());
    let details = view.user_details.as_ref().unwrap();
    assert_eq!(details.greeting, "Hi Ada Lovelace");
    assert_eq!(details.uid, format!("UID: {}", ada().id));

    assert_eq!(harness.owned_names(), vec!["A"]);
    assert_eq!(view.owned_things.rows[0].action, Some(RowAction::Delete(1)));
    assert_eq!(harness.app.open_subscriptions(), 2);
}

#[test]
fn sign_out_releases_owned_subscription() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);
    assert_eq!(harness.backend.subscriber_count(), 2);

    harness.sign_out();

    assert!(!harness.app.owned().has_open_handle());
    assert!(harness.app.owned().is_empty());
    assert!(harness.app.view().owned_things.is_empty());
    assert_eq!(harness.app.view().panels, Panels::signed_out());
    // only the shared feed stays open
    assert_eq!(harness.backend.subscriber_count(), 1);
    assert_eq!(harness.app.open_subscriptions(), 1);
}

#[test]
fn restored_session_subscribes_once() {
    let identity = InMemoryIdentity::new()
        .with_account(Provider::Google, ada())
        .signed_in_as(ada());
    let mut harness = Harness::with_identity(two_rows(), identity);

    // start-up check plus the listener's initial notification
    harness.app.start().unwrap();
    harness.app.start().unwrap();
    harness.settle();

    assert_eq!(harness.owned_names(), vec!["A"]);
    assert_eq!(harness.backend.subscriber_count(), 2);
    assert_eq!(harness.identity.listener_count(), 1);
}

#[test]
fn repeated_sign_in_does_not_duplicate_subscriptions() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);
    harness.sign_in(Provider::Google);

    assert_eq!(harness.backend.subscriber_count(), 2);
    assert_eq!(harness.owned_names(), vec!["A"]);
}

#[test]
fn switching_user_restarts_owned_cache() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);
    harness.sign_in(Provider::Github);

    assert_eq!(harness.app.user(), Some(&grace()));
    assert_eq!(harness.owned_names(), vec!["B"]);
    assert_eq!(harness.backend.subscriber_count(), 2);
}

#[test]
fn sign_out_during_fetch_discards_late_result() {
    let mut harness = Harness::started(two_rows());

    // both transitions are queued before the owned fetch can complete
    harness.app.sign_in(Provider::Google).unwrap();
    harness.app.sign_out().unwrap();
    harness.settle();

    assert!(harness.app.owned().is_empty());
    assert!(!harness.app.owned().has_open_handle());
    assert_eq!(harness.backend.subscriber_count(), 1);
}

#[test]
fn owned_fetch_failure_is_reported_and_retried_on_next_sign_in() {
    let mut harness = Harness::started(two_rows());
    harness.backend.set_unreachable(true);
    harness.sign_in(Provider::Google);

    let error = harness.app.view().owned_error.clone().unwrap();
    assert!(error.contains("owned"), "unexpected message: {}", error);
    assert_eq!(harness.app.open_subscriptions(), 1);

    harness.backend.set_unreachable(false);
    harness.sign_out();
    harness.sign_in(Provider::Google);

    assert_eq!(harness.app.view().owned_error, None);
    assert_eq!(harness.owned_names(), vec!["A"]);
}

#[test]
fn failed_sign_in_leaves_session_unchanged() {
    let mut harness = Harness::started(two_rows());
    harness.identity.set_failure(Some("popup closed"));

    assert!(harness.app.sign_in(Provider::Google).is_err());
    harness.settle();
    assert_eq!(harness.app.view().panels, Panels::signed_out());
}

#[test]
fn shutdown_releases_everything() {
    let mut harness = Harness::started(two_rows());
    harness.sign_in(Provider::Google);

    harness.app.shutdown();

    assert_eq!(harness.backend.subscriber_count(), 0);
    assert_eq!(harness.identity.listener_count(), 0);
    assert_eq!(harness.app.open_subscriptions(), 0);
}

#[test]
fn failed_owned_fetch_is_not_repeated_for_same_session() {
    let identity = InMemoryIdentity::new()
        .with_account(Provider::Google, ada())
        .signed_in_as(ada());
    let mut harness = Harness::with_identity(two_rows(), identity);
    harness.backend.set_unreachable(true);

    harness.app.start().unwrap();
    harness.settle();
    assert!(harness.app.view().owned_error.is_some());
    assert_eq!(harness.backend.fetch_count(), 2);

    // initial-session notification handled after the owned fetch failed
    harness.app.handle(AppEvent::AuthChanged(AuthChange {
        event: AuthEvent::InitialSession,
        user: Some(ada()),
    }));
    harness.settle();

    assert_eq!(harness.backend.fetch_count(), 2);
    assert!(harness.app.view().owned_error.is_some());
    assert_eq!(harness.app.view().panels, Panels::signed_in());
}

#[test]
fn shared_table_loads_when_auth_listener_fails() {
    let backend = InMemoryBackend::new();
    backend.seed(TABLE, two_rows()).unwrap();
    let mut app = App::new(
        ClientConfig::local(),
        Arc::new(WithoutListeners(InMemoryIdentity::new())),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )
    .unwrap();

    assert!(matches!(app.start(), Err(Error::Auth(AuthError::Provider(_)))));
    assert!(app.settle(SETTLE));
    assert_eq!(app.view().shared_things.names(), vec!["B", "A"]);
    assert_eq!(app.open_subscriptions(), 1);

    // a retry only retries the listener
    assert!(app.start().is_err());
    assert!(app.settle(SETTLE));
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(backend.subscriber_count(), 1);
}
