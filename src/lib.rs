//! things_sync - a realtime collection client.
//!
//! Keeps two local caches of a hosted table (every row, and the signed-in
//! user's rows) in step with the backend's change feed, and projects them
//! into view models after every change.
//!
//! The backend is reached through three traits: [`Identity`], [`Store`],
//! and [`ChangeFeed`]. [`InMemoryBackend`] and [`InMemoryIdentity`] provide
//! all three in-process; enable the `rest` feature for [`store::RestStore`].

pub mod app;
pub mod cache;
pub mod config;
mod error;
pub mod feed;
pub mod identity;
pub mod store;
pub mod thing;
pub mod view;

pub use app::{App, AppEvent, Command, CommandRejected};
pub use cache::{
    CacheError, CacheKind, CacheState, CollectionCache, FetchError, FetchOutcome, Generation,
    SubscribeOutcome,
};
pub use config::{ClientConfig, ConfigError};
pub use error::Error;
pub use feed::{ChangeEvent, ChangeFeed, FeedError, SubscriptionHandle};
pub use identity::{AuthChange, AuthError, AuthEvent, Identity, InMemoryIdentity, Provider, User};
pub use store::{Filter, InMemoryBackend, Store, StoreError};
pub use thing::{NewThing, RandomThingFactory, Thing, ThingFactory, ThingId};
pub use view::{Panels, Row, RowAction, RowActions, Screen, TableView, UserDetails};
