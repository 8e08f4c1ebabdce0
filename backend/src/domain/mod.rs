//! Domain primitives, aggregates and services.
//!
//! Purpose: Define the strongly typed board document, its ledger and
//! backups, and the services that enforce the versioned-write rules. The
//! domain depends only on the port traits in [`ports`]; adapters live under
//! `inbound` and `outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - BoardDocument / VersionedDocument: the normalized document and its version.
//! - BoardStateService / BackupService: driving port implementations.
//! - BackupScheduler: periodic backup production.

pub mod board;
mod board_service_support;
pub mod error;
pub mod ports;
pub mod trace_id;
pub mod user;

mod backup_scheduler;
mod backup_service;
mod board_state_service;

pub use self::backup_scheduler::{
    BackupCadence, BackupScheduler, BackupSchedulerHandle, SCHEDULER_BACKUP_SOURCE,
};
pub use self::backup_service::{BackupService, STARTUP_BACKUP_SOURCE};
pub use self::board::{
    ActionType, Backup, BackupId, BackupKind, BoardDocument, CLIENT_REQUEST_ID_MAX_LEN,
    ChangeOrigin, ClientRequestId, ClientRequestIdValidationError, DocumentError, DocumentShape,
    EntityChange, EntityEvent, EntityEventId, EntityId, LedgerEntry, LedgerEntryId, NewBackup,
    NewLedgerEntry, PROJECT_ID_KEY, PROJECTS_KEY, PayloadFingerprint, PayloadFingerprintError,
    StateVersion, UnknownActionType, UnknownBackupKind, VERSION_KEY, VersionedDocument,
    derive_entity_changes,
};
pub use self::board_service_support::version_conflict;
pub use self::board_state_service::BoardStateService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserIdValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use boardsync::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::not_found("no such backup"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
