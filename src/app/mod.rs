//! App - the application context that owns every piece of client state.
//!
//! All state changes funnel through one ordered queue of [`AppEvent`]s:
//! auth notifications, fetch results, change-feed deliveries, and command
//! completions. Network calls run on short-lived worker threads and post
//! their results back into the queue, so nothing blocks the queue and no
//! cache is ever touched from two places at once.
//!
//! ```text
//!  Identity ──AuthChanged──┐
//!  workers ──Fetched───────┤
//!  feed ─────Change────────┼──▶ mpsc queue ──▶ App::handle ──▶ caches ──▶ Screen
//!  workers ──CommandFinished┘
//! ```
//!
//! A cache opens its change-feed registration while handling its
//! `Fetched` event, in the same call that installs the snapshot. Writes the
//! store applies after the snapshot was read but before that event is
//! handled never reach the cache, so embedders should pump (or
//! [`App::settle`]) promptly after [`App::start`] and after sign-in.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use things_sync::{App, ClientConfig, InMemoryBackend, InMemoryIdentity, Provider, User};
//!
//! let backend = InMemoryBackend::new();
//! let identity = InMemoryIdentity::new()
//!     .with_account(Provider::Google, User::new("u1", "Ada", "https://a/ada.png"));
//!
//! let mut app = App::new(
//!     ClientConfig::local(),
//!     Arc::new(identity),
//!     Arc::new(backend.clone()),
//!     Arc::new(backend),
//! )
//! .unwrap();
//!
//! app.start().unwrap();
//! app.sign_in(Provider::Google).unwrap();
//! assert!(app.settle(Duration::from_secs(2)));
//!
//! app.create_thing().unwrap();
//! assert!(app.settle(Duration::from_secs(2)));
//! assert_eq!(app.view().owned_things.rows.len(), 1);
//! ```

mod commands;
mod session;

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{CacheKind, CollectionCache, FetchOutcome, Generation};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::feed::{ChangeEvent, ChangeFeed};
use crate::identity::{AuthChange, AuthListener, Identity, User};
use crate::store::{Filter, Store, StoreError};
use crate::thing::{RandomThingFactory, Thing, ThingFactory};
use crate::view::{RowActions, Screen};

pub use commands::{Command, CommandRejected};

/// One unit of work for the application queue.
#[derive(Debug)]
pub enum AppEvent {
    AuthChanged(AuthChange),
    Fetched {
        target: CacheKind,
        generation: Generation,
        result: Result<Vec<Thing>, StoreError>,
    },
    Change {
        target: CacheKind,
        generation: Generation,
        event: ChangeEvent,
    },
    CommandFinished {
        command: Command,
        result: Result<(), StoreError>,
    },
}

/// Client state for one session: both caches, the signed-in user, and the
/// screen they render into.
pub struct App {
    config: ClientConfig,
    identity: Arc<dyn Identity>,
    store: Arc<dyn Store>,
    feed: Arc<dyn ChangeFeed>,
    factory: Box<dyn ThingFactory>,
    shared: CollectionCache,
    owned: CollectionCache,
    user: Option<User>,
    screen: Screen,
    auth_listener: Option<AuthListener>,
    started: bool,
    in_flight: usize,
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl App {
    /// Create a client with a randomly seeded record factory.
    pub fn new(
        config: ClientConfig,
        identity: Arc<dyn Identity>,
        store: Arc<dyn Store>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Result<Self, Error> {
        Self::with_factory(
            config,
            identity,
            store,
            feed,
            Box::new(RandomThingFactory::from_entropy()),
        )
    }

    pub fn with_factory(
        config: ClientConfig,
        identity: Arc<dyn Identity>,
        store: Arc<dyn Store>,
        feed: Arc<dyn ChangeFeed>,
        factory: Box<dyn ThingFactory>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let (tx, rx) = channel();
        Ok(Self {
            config,
            identity,
            store,
            feed,
            factory,
            shared: CollectionCache::new(CacheKind::Shared),
            owned: CollectionCache::new(CacheKind::Owned),
            user: None,
            screen: Screen::default(),
            auth_listener: None,
            started: false,
            in_flight: 0,
            tx,
            rx,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signed-in user as last reported by the identity subsystem.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn shared(&self) -> &CollectionCache {
        &self.shared
    }

    pub fn owned(&self) -> &CollectionCache {
        &self.owned
    }

    /// Current view models.
    pub fn view(&self) -> &Screen {
        &self.screen
    }

    /// Number of open change-feed registrations across both caches.
    pub fn open_subscriptions(&self) -> usize {
        [&self.shared, &self.owned]
            .iter()
            .filter(|cache| cache.has_open_handle())
            .count()
    }

    /// Number of fetches and writes still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Load the shared cache, check the current user, and listen for auth
    /// transitions. Once this succeeds, repeated calls do nothing.
    ///
    /// The shared cache does not depend on the identity subsystem: if the
    /// listener cannot be registered the error is returned, the shared
    /// table still loads, and a later call retries the registration only.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.started {
            return Ok(());
        }
        info!(channel = %self.config.channel_name(None), "starting client");

        if !self.shared.is_started() {
            self.initialize(CacheKind::Shared, None);
        }

        match self.identity.current_user() {
            Ok(user) => self.on_auth_changed(user),
            Err(err) => {
                warn!(error = %err, "could not read current user on start-up");
                self.on_auth_changed(None);
            }
        }

        let tx = self.tx.clone();
        let listener = self
            .identity
            .on_auth_state_change(Box::new(move |change| {
                let _ = tx.send(AppEvent::AuthChanged(change));
            }))
            .inspect_err(|err| warn!(error = %err, "could not listen for auth changes"))?;
        self.auth_listener = Some(listener);
        self.started = true;
        Ok(())
    }

    /// Apply one queued event.
    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::AuthChanged(change) => {
                debug!(event = ?change.event, "auth notification");
                self.on_auth_changed(change.user);
            }
            AppEvent::Fetched {
                target,
                generation,
                result,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.on_fetched(target, generation, result);
            }
            AppEvent::Change {
                target,
                generation,
                event,
            } => {
                if self.cache_mut(target).apply(generation, event) {
                    self.render(target);
                }
            }
            AppEvent::CommandFinished { command, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(()) => debug!(?command, "command applied by store"),
                    Err(err) => warn!(?command, error = %err, "command failed"),
                }
            }
        }
    }

    /// Handle every event already queued. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Handle events until the queue is empty and nothing is in flight.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.in_flight == 0 {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => return false,
                // unreachable while self.tx is alive
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Release every subscription and the auth listener.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.auth_listener.take() {
            listener.remove();
        }
        self.shared.teardown();
        self.owned.teardown();
        self.render(CacheKind::Shared);
        self.render(CacheKind::Owned);
        info!("client shut down");
    }

    fn cache_mut(&mut self, target: CacheKind) -> &mut CollectionCache {
        match target {
            CacheKind::Shared => &mut self.shared,
            CacheKind::Owned => &mut self.owned,
        }
    }

    /// Start a cache lifecycle and fetch its snapshot on a worker thread.
    fn initialize(&mut self, target: CacheKind, filter: Option<Filter>) {
        let generation = match self.cache_mut(target).begin_initialize(filter.clone()) {
            Some(generation) => generation,
            None => return,
        };
        self.render(target);

        let store = Arc::clone(&self.store);
        let table = self.config.table.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let result = store.fetch_all(&table, filter.as_ref());
            let _ = tx.send(AppEvent::Fetched {
                target,
                generation,
                result,
            });
        });
    }

    fn on_fetched(
        &mut self,
        target: CacheKind,
        generation: Generation,
        result: Result<Vec<Thing>, StoreError>,
    ) {
        match self.cache_mut(target).complete_fetch(generation, result) {
            FetchOutcome::Stale => return,
            FetchOutcome::Failed(err) => {
                warn!(error = %err, "initial fetch failed");
                self.render(target);
                return;
            }
            FetchOutcome::Loaded(rows) => {
                debug!(cache = %target, rows, "initial fetch complete");
                self.render(target);
            }
        }
        self.subscribe(target);
    }

    fn subscribe(&mut self, target: CacheKind) {
        let table = self.config.table.clone();
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        let cache = match target {
            CacheKind::Shared => &mut self.shared,
            CacheKind::Owned => &mut self.owned,
        };
        let channel = self.config.channel_name(cache.filter());

        let outcome = cache.subscribe(feed.as_ref(), &channel, &table, move |generation, event| {
            let _ = tx.send(AppEvent::Change {
                target,
                generation,
                event,
            });
        });
        if let Err(err) = outcome {
            warn!(error = %err, "could not subscribe to changes");
            self.render(target);
        }
    }

    /// Re-project one cache into the screen.
    fn render(&mut self, target: CacheKind) {
        match target {
            CacheKind::Shared => {
                self.screen.shared_things = self.shared.render(RowActions::None);
                self.screen.shared_error = self.shared.error().map(|e| e.to_string());
            }
            CacheKind::Owned => {
                self.screen.owned_things = self.owned.render(RowActions::Delete);
                self.screen.owned_error = self.owned.error().map(|e| e.to_string());
            }
        }
        self.screen.renders += 1;
    }

    /// Run a store write on a worker thread; the result comes back as
    /// [`AppEvent::CommandFinished`].
    fn spawn_write<F>(&mut self, command: Command, write: F)
    where
        F: FnOnce(&dyn Store, &str) -> Result<(), StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let table = self.config.table.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let result = write(store.as_ref(), &table);
            let _ = tx.send(AppEvent::CommandFinished { command, result });
        });
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(listener) = self.auth_listener.take() {
            listener.remove();
        }
    }
}
