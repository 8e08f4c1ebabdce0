//! Board state aggregate: the versioned document, its ledger and backups.

mod backup;
mod changes;
mod document;
mod fingerprint;
mod ledger;
mod request_id;

pub use backup::{Backup, BackupKind, NewBackup, UnknownBackupKind};
pub use changes::{ActionType, ChangeOrigin, EntityChange, UnknownActionType, derive_entity_changes};
pub use document::{
    BoardDocument, DocumentError, DocumentShape, EntityId, PROJECT_ID_KEY, PROJECTS_KEY,
    StateVersion, VERSION_KEY, VersionedDocument,
};
pub use fingerprint::{PayloadFingerprint, PayloadFingerprintError};
pub use ledger::{
    BackupId, EntityEvent, EntityEventId, LedgerEntry, LedgerEntryId, NewLedgerEntry,
};
pub use request_id::{CLIENT_REQUEST_ID_MAX_LEN, ClientRequestId, ClientRequestIdValidationError};
