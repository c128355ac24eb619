//! Change feed - push notifications of inserts, updates, and deletes.
//!
//! A subscription is scoped to one table and an optional [`Filter`]. Events
//! are delivered in order within a subscription; nothing is assumed about
//! the relative order of two different subscriptions.
//!
//! ## Example
//!
//! ```
//! use things_sync::feed::{ChangeEvent, ChangeFeed};
//! use things_sync::{InMemoryBackend, NewThing, Store};
//! use std::sync::{Arc, Mutex};
//!
//! let backend = InMemoryBackend::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let handle = backend
//!     .subscribe("public:things", "things", None, Box::new(move |event: ChangeEvent| {
//!         sink.lock().unwrap().push(event);
//!     }))
//!     .unwrap();
//!
//! backend.insert("things", &NewThing::new("Hat", 3, "u1")).unwrap();
//! assert!(matches!(seen.lock().unwrap()[0], ChangeEvent::Insert(_)));
//!
//! handle.unsubscribe();
//! assert_eq!(backend.subscriber_count(), 0);
//! ```

mod wire;

use std::fmt;

use thiserror::Error;

use crate::store::Filter;
use crate::thing::{Thing, ThingId};

/// Error type for change-feed operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("change feed unreachable: {0}")]
    Unreachable(String),
    #[error("malformed change payload: {0}")]
    Malformed(String),
    #[error("change feed lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// One change to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Thing),
    Update(Thing),
    /// Carries only the key of the removed row.
    Delete(ThingId),
}

impl ChangeEvent {
    /// Id of the affected row.
    pub fn id(&self) -> ThingId {
        match self {
            ChangeEvent::Insert(thing) | ChangeEvent::Update(thing) => thing.id,
            ChangeEvent::Delete(id) => *id,
        }
    }

    /// New row state, absent for deletes.
    pub fn record(&self) -> Option<&Thing> {
        match self {
            ChangeEvent::Insert(thing) | ChangeEvent::Update(thing) => Some(thing),
            ChangeEvent::Delete(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert(_) => "INSERT",
            ChangeEvent::Update(_) => "UPDATE",
            ChangeEvent::Delete(_) => "DELETE",
        }
    }

    /// Decode a realtime payload (`{"eventType": ..., "new": ..., "old": ...}`).
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        wire::decode(json)
    }

    /// Encode as a realtime payload.
    pub fn to_json(&self) -> Result<String, FeedError> {
        wire::encode(self)
    }
}

/// Callback invoked once per delivered event.
pub type ChangeCallback = Box<dyn Fn(ChangeEvent) + Send + Sync>;

/// Change-feed registration interface.
pub trait ChangeFeed: Send + Sync {
    /// Open one registration on `channel` for `table`, scoped by `filter`.
    fn subscribe(
        &self,
        channel: &str,
        table: &str,
        filter: Option<&Filter>,
        on_event: ChangeCallback,
    ) -> Result<SubscriptionHandle, FeedError>;
}

/// A live registration for change events.
///
/// Released exactly once: either by [`SubscriptionHandle::unsubscribe`] or
/// when the handle is dropped.
pub struct SubscriptionHandle {
    id: u64,
    channel: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new<F>(id: u64, channel: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            channel: channel.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Stop receiving events.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("released", &self.release.is_none())
            .finish()
    }
}
