//! Port for the optional read-through document cache.
//!
//! The cache only ever accelerates reads. Adapters must treat an entry that
//! does not decode into a [`VersionedDocument`] as a miss, and callers must
//! invalidate after every accepted write rather than waiting for expiry.
//!
//! Invalidation carries the committed version and raises a floor: a `set`
//! below the floor is dropped. A read that loaded the document before a
//! concurrent commit therefore cannot park its older copy in the cache
//! after the commit has invalidated it.

use async_trait::async_trait;

use crate::domain::{StateVersion, VersionedDocument};

use super::define_port_error;

define_port_error! {
    /// Errors raised by cache adapters.
    pub enum StateCacheError {
        /// The cache backend rejected or failed the operation.
        Backend { message: String } => service_unavailable: "state cache backend failed: {message}",
    }
}

/// Read-through cache for the served document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateCache: Send + Sync {
    /// Fetch the cached document, if a trustworthy entry exists.
    async fn get(&self) -> Result<Option<VersionedDocument>, StateCacheError>;

    /// Store a freshly loaded document unless it is older than the floor.
    async fn set(&self, document: &VersionedDocument) -> Result<(), StateCacheError>;

    /// Drop any cached entry and raise the floor to `committed`.
    async fn invalidate(&self, committed: StateVersion) -> Result<(), StateCacheError>;
}

/// Cache that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStateCache;

#[async_trait]
impl StateCache for NoOpStateCache {
    async fn get(&self) -> Result<Option<VersionedDocument>, StateCacheError> {
        Ok(None)
    }

    async fn set(&self, _document: &VersionedDocument) -> Result<(), StateCacheError> {
        Ok(())
    }

    async fn invalidate(&self, _committed: StateVersion) -> Result<(), StateCacheError> {
        Ok(())
    }
}
