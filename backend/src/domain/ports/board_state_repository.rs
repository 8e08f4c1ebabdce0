//! Port abstraction for the versioned board document store.
//!
//! Adapters own the compare-and-write transaction: under an exclusive lock
//! on the document they check the idempotency token, compare versions,
//! record the ledger entry with its derived entity changes, and upsert the
//! document. Nothing of a rejected or failed write may remain visible.

use async_trait::async_trait;

use crate::domain::{
    BoardDocument, ChangeOrigin, ClientRequestId, LedgerEntryId, StateVersion, UserId,
    VersionedDocument,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by board state persistence adapters.
    pub enum BoardStateRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => service_unavailable: "board state repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => internal: "board state repository query failed: {message}",
        /// A stored row could not be interpreted.
        Corrupt { message: String } => internal: "stored board state is invalid: {message}",
        /// A duplicate token was detected but its ledger entry could not be read back.
        DuplicateVanished { client_request_id: String } =>
            internal: "ledger entry for duplicate token {client_request_id} disappeared",
    }
}

/// A write presented to [`BoardStateRepository::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedWrite {
    /// Normalized next document.
    pub document: BoardDocument,
    /// Version the writer last read.
    pub expected_version: StateVersion,
    /// Idempotency token.
    pub client_request_id: ClientRequestId,
    /// Why the write happened.
    pub origin: ChangeOrigin,
    /// Who made the write, when known.
    pub user_id: Option<UserId>,
}

/// Result of a compare-and-write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write was applied.
    Committed {
        /// Version now stored.
        version: StateVersion,
        /// Ledger entry recording the write.
        ledger_entry_id: LedgerEntryId,
    },
    /// The token had already been accepted; nothing was applied.
    Replayed {
        /// Version recorded when the token was first accepted.
        version: StateVersion,
        /// Whether the replayed document matches the recorded one.
        payload_matches: bool,
    },
    /// The stored version differed from the expected one.
    Conflict {
        /// Authoritative stored version.
        current_version: StateVersion,
    },
}

/// Persistence port for the singleton board document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardStateRepository: Send + Sync {
    /// Read the current document, normalized, or `None` before the first write.
    ///
    /// Plain read: never takes the document lock.
    async fn load(&self) -> Result<Option<VersionedDocument>, BoardStateRepositoryError>;

    /// Apply a versioned write atomically.
    async fn commit(&self, write: VersionedWrite)
    -> Result<CommitOutcome, BoardStateRepositoryError>;
}
