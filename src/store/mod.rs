//! Store - the hosted table's query interface.
//!
//! The store owns persistence, id assignment, and query filtering. Clients
//! only read full snapshots, insert new rows, and delete rows by id; every
//! resulting change reaches local caches through the change feed.
//!
//! ```text
//! ┌──────────────┐  fetch_all / insert / delete_by_id  ┌─────────────────┐
//! │     App      │ ──────────────────────────────────▶ │      Store      │
//! │ (worker thr.)│                                     │ InMemoryBackend │
//! └──────────────┘                                     │ RestStore (opt) │
//!         ▲                                            └────────┬────────┘
//!         │               ChangeEvent (per subscription)        │
//!         └─────────────────────────────────────────────────────┘
//! ```

mod in_memory;
#[cfg(feature = "rest")]
mod rest;

use std::fmt;

use thiserror::Error;

use crate::thing::{NewThing, Thing, ThingId};

pub use in_memory::InMemoryBackend;
#[cfg(feature = "rest")]
pub use rest::RestStore;

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unreachable: {0}")]
    Unreachable(String),
    /// The store answered but refused the request.
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// No row with this id.
    #[error("thing not found: {0}")]
    NotFound(ThingId),
    /// A response body could not be decoded.
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Equality filter on one column, written `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Filter selecting the rows owned by `user_id`.
    pub fn owned_by(user_id: &str) -> Self {
        Self::eq("owner", user_id)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, thing: &Thing) -> bool {
        thing.column(&self.column).as_deref() == Some(self.value.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// Query interface of the hosted table.
///
/// Every call is attempted exactly once; there are no retries.
pub trait Store: Send + Sync {
    /// Every row of `table` matching `filter`, or all rows when `filter` is `None`.
    fn fetch_all(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Thing>, StoreError>;

    /// Insert a row and return it with its assigned id.
    fn insert(&self, table: &str, thing: &NewThing) -> Result<Thing, StoreError>;

    /// Delete the row with this id.
    fn delete_by_id(&self, table: &str, id: ThingId) -> Result<(), StoreError>;
}
