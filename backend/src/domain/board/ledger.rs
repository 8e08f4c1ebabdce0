//! Ledger records.
//!
//! The ledger has two layers: one [`LedgerEntry`] per accepted write, keyed
//! by its idempotency token and carrying the full next document, and zero
//! or more [`EntityEvent`]s per entry describing project-level changes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ActionType, BoardDocument, ChangeOrigin, ClientRequestId, EntityChange, EntityId,
    PayloadFingerprint, StateVersion,
};
use crate::domain::UserId;

macro_rules! define_sequence_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a server-assigned identifier.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Raw identifier.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_sequence_id!(
    /// Server-assigned ledger entry identifier.
    LedgerEntryId
);
define_sequence_id!(
    /// Server-assigned entity event identifier.
    EntityEventId
);
define_sequence_id!(
    /// Server-assigned backup identifier.
    BackupId
);

/// A write about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    /// Idempotency token.
    pub client_request_id: ClientRequestId,
    /// Version the write produces.
    pub version: StateVersion,
    /// The full next document.
    pub data: BoardDocument,
    /// Fingerprint of `data`.
    pub payload_hash: PayloadFingerprint,
    /// Why the write happened.
    pub origin: ChangeOrigin,
    /// Who made the write, when known.
    pub user_id: Option<UserId>,
}

/// A recorded write.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Sequence identifier.
    pub id: LedgerEntryId,
    /// Idempotency token.
    pub client_request_id: ClientRequestId,
    /// Version the write produced.
    pub version: StateVersion,
    /// The document as written.
    pub data: BoardDocument,
    /// Fingerprint of `data`.
    pub payload_hash: PayloadFingerprint,
    /// Origin label, see [`ChangeOrigin::kind`].
    pub origin: String,
    /// Who made the write, when known.
    pub user_id: Option<UserId>,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

/// A project-level change within a recorded write.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityEvent {
    /// Sequence identifier.
    pub id: EntityEventId,
    /// Owning ledger entry.
    pub ledger_entry_id: LedgerEntryId,
    /// Project affected.
    pub project_id: EntityId,
    /// Who made the change, when known.
    pub user_id: Option<UserId>,
    /// What happened.
    pub action_type: ActionType,
    /// Diff metadata.
    pub payload: Value,
    /// Project state after the change, `None` for deletes.
    pub snapshot_after: Option<Value>,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

impl EntityEvent {
    /// Materialise a derived change once its ledger entry is known.
    pub fn from_change(
        id: EntityEventId,
        ledger_entry_id: LedgerEntryId,
        user_id: Option<UserId>,
        change: EntityChange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ledger_entry_id,
            project_id: change.project_id,
            user_id,
            action_type: change.action_type,
            payload: change.payload,
            snapshot_after: change.snapshot_after,
            created_at,
        }
    }
}
