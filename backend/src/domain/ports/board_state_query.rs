//! Driving port for reading the board document and its ledger.

use async_trait::async_trait;

use crate::domain::{EntityEvent, EntityId, Error, LedgerEntry, VersionedDocument};

/// Read use-cases for the board document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardStateQuery: Send + Sync {
    /// Current document, or `None` before the first write.
    async fn fetch(&self) -> Result<Option<VersionedDocument>, Error>;

    /// Every ledger entry, oldest first.
    async fn list_entries(&self) -> Result<Vec<LedgerEntry>, Error>;

    /// Entity events for one project, newest first.
    async fn entity_history(&self, project_id: &EntityId) -> Result<Vec<EntityEvent>, Error>;
}
