use thiserror::Error;

use crate::app::CommandRejected;
use crate::cache::{CacheError, FetchError};
use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::identity::AuthError;
use crate::store::StoreError;

/// Any error the client can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Rejected(#[from] CommandRejected),
}
