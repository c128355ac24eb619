//! Identity - who is signed in, and notifications when that changes.
//!
//! The provider's OAuth flow is external; the client only asks for the
//! current user, starts sign-in/sign-out, and listens for transitions.

mod in_memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::InMemoryIdentity;

/// Error type for identity operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The identity provider reported a failure.
    #[error("identity provider error: {0}")]
    Provider(String),
    /// No sign-in flow is configured for this provider.
    #[error("no account available for provider {0}")]
    UnknownProvider(Provider),
    #[error("identity lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// OAuth providers the client can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    Google,
    Github,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => write!(f, "google"),
            Provider::Github => write!(f, "github"),
        }
    }
}

/// An authenticated user, with the provider's profile metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub avatar_url: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            avatar_url: avatar_url.into(),
        }
    }
}

/// Kind of authentication transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// Current state, reported once when a listener registers.
    InitialSession,
    SignedIn,
    SignedOut,
}

/// An authentication-state notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub user: Option<User>,
}

/// Callback invoked for every authentication-state notification.
pub type AuthCallback = Box<dyn Fn(AuthChange) + Send + Sync>;

/// Identity subsystem interface.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Result<Option<User>, AuthError>;

    /// Start the provider's sign-in flow.
    fn sign_in(&self, provider: Provider) -> Result<(), AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;

    /// Register for transitions. Implementations may report the current
    /// state immediately as [`AuthEvent::InitialSession`].
    fn on_auth_state_change(&self, callback: AuthCallback) -> Result<AuthListener, AuthError>;
}

/// Registration returned by [`Identity::on_auth_state_change`].
///
/// Removed on [`AuthListener::remove`] or drop.
pub struct AuthListener {
    id: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthListener {
    pub fn new<F>(id: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: id.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remove(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for AuthListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthListener").field("id", &self.id).finish()
    }
}
