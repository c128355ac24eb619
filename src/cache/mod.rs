//! Collection caches - local copies of the table kept live by the change feed.
//!
//! A cache is parameterized by an optional ownership [`Filter`]: the shared
//! cache mirrors every row, the owned cache only the current user's rows.
//!
//! ```text
//!                 begin_initialize          complete_fetch(Ok)        subscribe
//! Uninitialized ───────────────▶ Fetching ─────────────▶ Fetching ─────────▶ Live
//!       ▲                          │  (loaded=false)   (loaded=true)          │
//!       │                          │ complete_fetch(Err)                      │ apply(event)*
//!       │                          ▼                                          │
//!       │                       Failed ◀──── subscribe(Err) ──────────────────┤
//!       │                                                                     │
//!   TornDown ◀──────────────────────── teardown ──────────────────────────────┘
//! ```
//!
//! Every lifecycle gets a fresh [`Generation`]. Fetch results and change
//! events carrying an older generation are discarded, so a sign-out during
//! an in-flight fetch cannot repopulate a torn-down cache.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::feed::{ChangeEvent, ChangeFeed, FeedError, SubscriptionHandle};
use crate::store::{Filter, StoreError};
use crate::thing::{Thing, ThingId};
use crate::view::{RowActions, TableView};

/// Token identifying one cache lifecycle.
pub type Generation = u64;

/// Which of the two caches an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Every row, visible to any user.
    Shared,
    /// Rows owned by the signed-in user.
    Owned,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Shared => write!(f, "shared"),
            CacheKind::Owned => write!(f, "owned"),
        }
    }
}

/// The initial full fetch of a cache failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("initial fetch for {cache} cache failed: {source}")]
pub struct FetchError {
    pub cache: CacheKind,
    #[source]
    pub source: StoreError,
}

/// Error type for cache lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("subscription for {cache} cache failed: {source}")]
    Subscribe {
        cache: CacheKind,
        #[source]
        source: FeedError,
    },
    /// The operation is not allowed in the cache's current state.
    #[error("cannot {operation} {cache} cache while {state}")]
    InvalidState {
        cache: CacheKind,
        operation: &'static str,
        state: &'static str,
    },
}

/// Lifecycle state of a cache.
#[derive(Debug)]
pub enum CacheState {
    Uninitialized,
    Fetching {
        generation: Generation,
        /// Whether the snapshot has arrived.
        loaded: bool,
    },
    Live {
        generation: Generation,
        handle: SubscriptionHandle,
    },
    Failed {
        generation: Generation,
        error: CacheError,
    },
    TornDown,
}

impl CacheState {
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::Uninitialized => "uninitialized",
            CacheState::Fetching { .. } => "fetching",
            CacheState::Live { .. } => "live",
            CacheState::Failed { .. } => "failed",
            CacheState::TornDown => "torn down",
        }
    }

    fn generation(&self) -> Option<Generation> {
        match self {
            CacheState::Fetching { generation, .. }
            | CacheState::Live { generation, .. }
            | CacheState::Failed { generation, .. } => Some(*generation),
            CacheState::Uninitialized | CacheState::TornDown => None,
        }
    }
}

/// Result of handing a fetch result to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot installed with this many rows.
    Loaded(usize),
    /// The fetch failed; the cache stays empty.
    Failed(FetchError),
    /// The result belongs to an earlier lifecycle and was dropped.
    Stale,
}

/// Result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new registration was opened.
    Opened { handle_id: u64 },
    /// A registration was already open; nothing changed.
    AlreadyOpen { handle_id: u64 },
}

/// An in-memory map from id to thing, plus its lifecycle.
#[derive(Debug)]
pub struct CollectionCache {
    kind: CacheKind,
    filter: Option<Filter>,
    things: HashMap<ThingId, Thing>,
    state: CacheState,
    last_generation: Generation,
}

impl CollectionCache {
    pub fn new(kind: CacheKind) -> Self {
        Self {
            kind,
            filter: None,
            things: HashMap::new(),
            state: CacheState::Uninitialized,
            last_generation: 0,
        }
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Filter of the current lifecycle.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Generation of the current lifecycle, if one is running.
    pub fn generation(&self) -> Option<Generation> {
        self.state.generation()
    }

    /// Fetching or live.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            CacheState::Fetching { .. } | CacheState::Live { .. }
        )
    }

    /// A lifecycle has begun and not been torn down, including one that
    /// ended in [`CacheState::Failed`].
    pub fn is_started(&self) -> bool {
        self.is_active() || matches!(self.state, CacheState::Failed { .. })
    }

    pub fn has_open_handle(&self) -> bool {
        matches!(self.state, CacheState::Live { .. })
    }

    /// Error that ended the current lifecycle.
    pub fn error(&self) -> Option<&CacheError> {
        match &self.state {
            CacheState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn get(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(&id)
    }

    pub fn contains(&self, id: ThingId) -> bool {
        self.things.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Start a lifecycle: clear the map and hand out a fresh generation.
    ///
    /// Returns `None` when a lifecycle is already fetching or live.
    pub fn begin_initialize(&mut self, filter: Option<Filter>) -> Option<Generation> {
        if self.is_active() {
            debug!(cache = %self.kind, state = self.state.name(), "initialize ignored");
            return None;
        }

        self.last_generation += 1;
        let generation = self.last_generation;
        self.things.clear();
        self.filter = filter;
        self.state = CacheState::Fetching {
            generation,
            loaded: false,
        };
        debug!(cache = %self.kind, generation, filter = ?self.filter.as_ref().map(|f| f.to_string()), "fetching");
        Some(generation)
    }

    /// Install the snapshot of a full fetch.
    pub fn complete_fetch(
        &mut self,
        generation: Generation,
        result: Result<Vec<Thing>, StoreError>,
    ) -> FetchOutcome {
        match self.state {
            CacheState::Fetching {
                generation: current,
                loaded: false,
            } if current == generation => {}
            _ => {
                debug!(cache = %self.kind, generation, state = self.state.name(), "dropping stale fetch result");
                return FetchOutcome::Stale;
            }
        }

        match result {
            Ok(things) => {
                self.things = things.into_iter().map(|t| (t.id, t)).collect();
                self.state = CacheState::Fetching {
                    generation,
                    loaded: true,
                };
                debug!(cache = %self.kind, generation, rows = self.things.len(), "snapshot loaded");
                FetchOutcome::Loaded(self.things.len())
            }
            Err(source) => {
                let error = FetchError {
                    cache: self.kind,
                    source,
                };
                self.things.clear();
                self.state = CacheState::Failed {
                    generation,
                    error: CacheError::Fetch(error.clone()),
                };
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Open the change-feed registration for the current lifecycle.
    ///
    /// `deliver` receives every event tagged with this lifecycle's
    /// generation. At most one registration is open at a time.
    pub fn subscribe<F>(
        &mut self,
        feed: &dyn ChangeFeed,
        channel: &str,
        table: &str,
        deliver: F,
    ) -> Result<SubscribeOutcome, CacheError>
    where
        F: Fn(Generation, ChangeEvent) + Send + Sync + 'static,
    {
        let generation = match &self.state {
            CacheState::Live { handle, .. } => {
                return Ok(SubscribeOutcome::AlreadyOpen {
                    handle_id: handle.id(),
                })
            }
            CacheState::Fetching {
                generation,
                loaded: true,
            } => *generation,
            other => {
                return Err(CacheError::InvalidState {
                    cache: self.kind,
                    operation: "subscribe",
                    state: other.name(),
                })
            }
        };

        let opened = feed.subscribe(
            channel,
            table,
            self.filter.as_ref(),
            Box::new(move |event| deliver(generation, event)),
        );

        match opened {
            Ok(handle) => {
                let handle_id = handle.id();
                info!(cache = %self.kind, channel, handle_id, "subscribed");
                self.state = CacheState::Live { generation, handle };
                Ok(SubscribeOutcome::Opened { handle_id })
            }
            Err(source) => {
                let error = CacheError::Subscribe {
                    cache: self.kind,
                    source,
                };
                self.state = CacheState::Failed {
                    generation,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    /// Merge one change event: deletes remove the key, inserts and updates
    /// upsert the full row. Returns `false` when the event was stale.
    pub fn apply(&mut self, generation: Generation, event: ChangeEvent) -> bool {
        match self.state {
            CacheState::Live {
                generation: current,
                ..
            } if current == generation => {}
            _ => {
                debug!(cache = %self.kind, generation, kind = event.kind(), "dropping stale change");
                return false;
            }
        }

        match event {
            ChangeEvent::Delete(id) => {
                self.things.remove(&id);
            }
            ChangeEvent::Insert(thing) | ChangeEvent::Update(thing) => {
                self.things.insert(thing.id, thing);
            }
        }
        true
    }

    /// Release the registration (if any) and clear the map. Safe to repeat.
    pub fn teardown(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, CacheState::TornDown);
        self.things.clear();
        self.filter = None;

        match previous {
            CacheState::Live { handle, generation } => {
                info!(cache = %self.kind, generation, channel = handle.channel(), "unsubscribed");
                handle.unsubscribe();
                true
            }
            CacheState::Uninitialized => {
                self.state = CacheState::Uninitialized;
                false
            }
            _ => false,
        }
    }

    /// Rows ordered by weight, heaviest first. Ties fall back to id order.
    pub fn sorted(&self) -> Vec<&Thing> {
        let mut rows: Vec<&Thing> = self.things.values().collect();
        rows.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.id.cmp(&b.id)));
        rows
    }

    /// Project the current contents into a table.
    pub fn render(&self, actions: RowActions) -> TableView {
        TableView::project(&self.sorted(), actions)
    }
}
