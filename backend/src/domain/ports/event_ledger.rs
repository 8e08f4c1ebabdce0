//! Port abstraction for the append-only write ledger.

use async_trait::async_trait;

use crate::domain::{EntityEvent, EntityEventId, EntityId, LedgerEntry};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger adapters.
    pub enum EventLedgerError {
        /// Repository connection could not be established.
        Connection { message: String } => service_unavailable: "event ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => internal: "event ledger query failed: {message}",
        /// A stored row could not be interpreted.
        Corrupt { message: String } => internal: "stored ledger entry is invalid: {message}",
    }
}

/// Read access to the ledger.
///
/// Entries are only ever appended by [`super::BoardStateRepository::commit`],
/// inside the transaction that writes the document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Every entry in replay order: `(created_at, id)` ascending.
    async fn list(&self) -> Result<Vec<LedgerEntry>, EventLedgerError>;

    /// Entity events for one project, newest first: `(created_at, id)` descending.
    async fn history_for(&self, project_id: &EntityId)
    -> Result<Vec<EntityEvent>, EventLedgerError>;

    /// Look up one entity event.
    async fn find_entity_event(
        &self,
        id: EntityEventId,
    ) -> Result<Option<EntityEvent>, EventLedgerError>;
}
