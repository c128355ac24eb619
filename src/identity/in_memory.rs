//! InMemoryIdentity - scripted identity provider for tests and demos.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use event_emitter_rs::EventEmitter;
use tracing::debug;

use super::{AuthCallback, AuthChange, AuthError, AuthEvent, AuthListener, Identity, Provider, User};

const AUTH_STATE_CHANGED: &str = "auth_state_changed";

#[derive(Default)]
struct State {
    current: Option<User>,
    accounts: HashMap<Provider, User>,
    failure: Option<String>,
    listeners: HashSet<String>,
}

/// Identity provider with one scripted account per OAuth provider.
///
/// Notifications go through an [`EventEmitter`]; `emit` waits for every
/// listener so transitions are observed in the order they happen.
///
/// ## Example
///
/// ```
/// use things_sync::identity::{Identity, InMemoryIdentity, Provider, User};
///
/// let identity = InMemoryIdentity::new()
///     .with_account(Provider::Google, User::new("u1", "Ada", "https://a/ada.png"));
///
/// identity.sign_in(Provider::Google).unwrap();
/// assert_eq!(identity.current_user().unwrap().unwrap().id, "u1");
/// ```
#[derive(Clone, Default)]
pub struct InMemoryIdentity {
    state: Arc<Mutex<State>>,
    emitter: Arc<Mutex<EventEmitter>>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account returned when signing in with `provider`.
    pub fn with_account(self, provider: Provider, user: User) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.accounts.insert(provider, user);
        }
        self
    }

    /// Start out with `user` already signed in (a restored session).
    pub fn signed_in_as(self, user: User) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.current = Some(user);
        }
        self
    }

    /// Make every subsequent call fail with a provider error, or clear it.
    pub fn set_failure(&self, failure: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = failure.map(str::to_string);
        }
    }

    /// Number of registered auth-state listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().map(|s| s.listeners.len()).unwrap_or(0)
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::LockPoisoned(operation))
    }

    fn check_failure(state: &State) -> Result<(), AuthError> {
        match &state.failure {
            Some(message) => Err(AuthError::Provider(message.clone())),
            None => Ok(()),
        }
    }

    fn notify(&self, change: AuthChange) -> Result<(), AuthError> {
        debug!(event = ?change.event, user = ?change.user.as_ref().map(|u| &u.id), "auth state changed");
        let mut emitter = self
            .emitter
            .lock()
            .map_err(|_| AuthError::LockPoisoned("notify"))?;
        for handle in emitter.emit(AUTH_STATE_CHANGED, change) {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Identity for InMemoryIdentity {
    fn current_user(&self) -> Result<Option<User>, AuthError> {
        let state = self.lock("current_user")?;
        Self::check_failure(&state)?;
        Ok(state.current.clone())
    }

    fn sign_in(&self, provider: Provider) -> Result<(), AuthError> {
        let user = {
            let mut state = self.lock("sign_in")?;
            Self::check_failure(&state)?;
            let user = state
                .accounts
                .get(&provider)
                .cloned()
                .ok_or(AuthError::UnknownProvider(provider))?;
            state.current = Some(user.clone());
            user
        };
        self.notify(AuthChange {
            event: AuthEvent::SignedIn,
            user: Some(user),
        })
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        {
            let mut state = self.lock("sign_out")?;
            Self::check_failure(&state)?;
            state.current = None;
        }
        self.notify(AuthChange {
            event: AuthEvent::SignedOut,
            user: None,
        })
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Result<AuthListener, AuthError> {
        let callback: Arc<dyn Fn(AuthChange) + Send + Sync> = Arc::from(callback);
        let listener = Arc::clone(&callback);
        let id = self
            .emitter
            .lock()
            .map_err(|_| AuthError::LockPoisoned("on_auth_state_change"))?
            .on(AUTH_STATE_CHANGED, move |change: AuthChange| listener(change));

        let current = {
            let mut state = self.lock("on_auth_state_change")?;
            state.listeners.insert(id.clone());
            state.current.clone()
        };
        callback(AuthChange {
            event: AuthEvent::InitialSession,
            user: current,
        });

        let emitter = Arc::clone(&self.emitter);
        let state = Arc::clone(&self.state);
        let listener_id = id.clone();
        Ok(AuthListener::new(id, move || {
            if let Ok(mut emitter) = emitter.lock() {
                emitter.remove_listener(&listener_id);
            }
            if let Ok(mut state) = state.lock() {
                state.listeners.remove(&listener_id);
            }
        }))
    }
}
