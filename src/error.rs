use thiserror::Error;

use crate::book::BookError;
use crate::config::ConfigError;
use crate::parse::ParseError;
use crate::store::StoreError;
use crate::NativeSyncError;

/// Unified error type covering storage, engine sync, parsing and
/// configuration.
///
/// Returned by [`RedirectService`](crate::RedirectService) operations, which
/// touch more than one of these concerns.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] NativeSyncError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Book(#[from] BookError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
