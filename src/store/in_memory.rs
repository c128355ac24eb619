//! InMemoryBackend - a hosted table and its change feed in one process.
//!
//! Implements both [`Store`] and [`ChangeFeed`] so a client can be driven
//! end-to-end in tests and demos. Writes notify matching subscribers
//! synchronously, in write order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{Filter, Store, StoreError};
use crate::feed::{ChangeEvent, ChangeCallback, ChangeFeed, FeedError, SubscriptionHandle};
use crate::thing::{NewThing, Thing, ThingId};

struct Subscriber {
    table: String,
    filter: Option<Filter>,
    callback: Arc<dyn Fn(ChangeEvent) + Send + Sync>,
}

impl Subscriber {
    fn wants(&self, table: &str, row: Option<&Thing>) -> bool {
        if self.table != table {
            return false;
        }
        match (&self.filter, row) {
            (None, _) => true,
            (Some(filter), Some(row)) => filter.matches(row),
            // Raw deletes carry no row to match against.
            (Some(_), None) => true,
        }
    }
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, BTreeMap<ThingId, Thing>>,
    next_id: ThingId,
    subscribers: BTreeMap<u64, Subscriber>,
    next_subscriber: u64,
    unreachable: bool,
    writes: usize,
    fetches: usize,
}

/// In-memory table storage plus change feed.
///
/// Clone-friendly via Arc; clones share the same tables and subscribers.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Mutex<Inner>>,
    // Serializes write + delivery so subscribers see events in write order.
    delivery: Arc<Mutex<()>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    fn reachable(inner: &Inner) -> Result<(), StoreError> {
        if inner.unreachable {
            return Err(StoreError::Unreachable("backend offline".into()));
        }
        Ok(())
    }

    /// Insert rows without going through reachability checks.
    pub fn seed(&self, table: &str, things: Vec<NewThing>) -> Result<Vec<Thing>, StoreError> {
        things
            .into_iter()
            .map(|thing| {
                self.write(table, "seed", |inner| {
                    let stored = Self::store_new(inner, table, thing);
                    Ok((stored.clone(), Some(Change::inserted(stored))))
                })
            })
            .collect()
    }

    /// Overwrite an existing row, as another client would.
    pub fn update(&self, table: &str, thing: Thing) -> Result<Thing, StoreError> {
        self.write(table, "update", |inner| {
            Self::reachable(inner)?;
            let rows = inner.tables.entry(table.to_string()).or_default();
            if !rows.contains_key(&thing.id) {
                return Err(StoreError::NotFound(thing.id));
            }
            rows.insert(thing.id, thing.clone());
            let change = Change {
                event: ChangeEvent::Update(thing.clone()),
                row: thing.clone(),
            };
            Ok((thing, Some(change)))
        })
    }

    /// Deliver a raw event to the table's subscribers without touching storage.
    ///
    /// Deletes reach every subscriber of the table regardless of filter.
    pub fn broadcast(&self, table: &str, event: ChangeEvent) -> Result<(), StoreError> {
        let _order = self
            .delivery
            .lock()
            .map_err(|_| StoreError::LockPoisoned("broadcast"))?;
        let callbacks = {
            let inner = self.lock("broadcast")?;
            Self::matching(&inner, table, event.record())
        };
        for callback in callbacks {
            callback(event.clone());
        }
        Ok(())
    }

    /// Decode a realtime payload and deliver it like [`Self::broadcast`].
    pub fn broadcast_json(&self, table: &str, payload: &str) -> Result<(), StoreError> {
        let event =
            ChangeEvent::from_json(payload).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.broadcast(table, event)
    }

    /// Simulate the backend going offline (or coming back).
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unreachable = unreachable;
        }
    }

    /// Number of open change-feed registrations.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of `fetch_all` calls, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.fetches).unwrap_or(0)
    }

    /// Number of successful client writes (inserts and deletes).
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    /// Current rows of a table, ordered by id.
    pub fn rows(&self, table: &str) -> Vec<Thing> {
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .tables
                    .get(table)
                    .map(|rows| rows.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Assign the next id and store the row.
    fn store_new(inner: &mut Inner, table: &str, thing: NewThing) -> Thing {
        inner.next_id += 1;
        let stored = thing.into_thing(inner.next_id);
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(stored.id, stored.clone());
        stored
    }

    fn matching(
        inner: &Inner,
        table: &str,
        row: Option<&Thing>,
    ) -> Vec<Arc<dyn Fn(ChangeEvent) + Send + Sync>> {
        inner
            .subscribers
            .values()
            .filter(|sub| sub.wants(table, row))
            .map(|sub| Arc::clone(&sub.callback))
            .collect()
    }

    /// Apply a mutation, then notify subscribers matching the affected row.
    fn write<T, F>(&self, table: &str, operation: &'static str, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Inner) -> Result<(T, Option<Change>), StoreError>,
    {
        let _order = self
            .delivery
            .lock()
            .map_err(|_| StoreError::LockPoisoned(operation))?;

        let (result, notifications) = {
            let mut inner = self.lock(operation)?;
            let (result, change) = mutate(&mut inner)?;
            let notifications = change.map(|change| {
                let callbacks = Self::matching(&inner, table, Some(&change.row));
                (change.event, callbacks)
            });
            (result, notifications)
        };

        if let Some((event, callbacks)) = notifications {
            debug!(
                table,
                kind = event.kind(),
                id = event.id(),
                subscribers = callbacks.len(),
                "delivering change"
            );
            for callback in callbacks {
                callback(event.clone());
            }
        }
        Ok(result)
    }
}

/// A stored change and the row it affected, used for filter matching.
struct Change {
    event: ChangeEvent,
    row: Thing,
}

impl Change {
    fn inserted(row: Thing) -> Self {
        Self {
            event: ChangeEvent::Insert(row.clone()),
            row,
        }
    }

    fn delete(row: Thing) -> Self {
        Self {
            event: ChangeEvent::Delete(row.id),
            row,
        }
    }
}

impl Store for InMemoryBackend {
    fn fetch_all(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Thing>, StoreError> {
        let mut inner = self.lock("fetch_all")?;
        inner.fetches += 1;
        Self::reachable(&inner)?;
        let rows = match inner.tables.get(table) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .values()
            .filter(|thing| filter.map_or(true, |f| f.matches(thing)))
            .cloned()
            .collect())
    }

    fn insert(&self, table: &str, thing: &NewThing) -> Result<Thing, StoreError> {
        self.write(table, "insert", |inner| {
            Self::reachable(inner)?;
            inner.writes += 1;
            let stored = Self::store_new(inner, table, thing.clone());
            Ok((stored.clone(), Some(Change::inserted(stored))))
        })
    }

    fn delete_by_id(&self, table: &str, id: ThingId) -> Result<(), StoreError> {
        self.write(table, "delete_by_id", |inner| {
            Self::reachable(inner)?;
            inner.writes += 1;
            let removed = inner
                .tables
                .get_mut(table)
                .and_then(|rows| rows.remove(&id));
            // Deleting a missing row is not an error, and emits nothing.
            Ok(((), removed.map(Change::delete)))
        })
    }
}

impl ChangeFeed for InMemoryBackend {
    fn subscribe(
        &self,
        channel: &str,
        table: &str,
        filter: Option<&Filter>,
        on_event: ChangeCallback,
    ) -> Result<SubscriptionHandle, FeedError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| FeedError::LockPoisoned("subscribe"))?;
        if inner.unreachable {
            return Err(FeedError::Unreachable("backend offline".into()));
        }

        inner.next_subscriber += 1;
        let id = inner.next_subscriber;
        inner.subscribers.insert(
            id,
            Subscriber {
                table: table.to_string(),
                filter: filter.cloned(),
                callback: Arc::from(on_event),
            },
        );
        debug!(channel, id, "subscriber registered");

        let registry = Arc::clone(&self.inner);
        Ok(SubscriptionHandle::new(id, channel, move || {
            if let Ok(mut inner) = registry.lock() {
                inner.subscribers.remove(&id);
            }
        }))
    }
}
