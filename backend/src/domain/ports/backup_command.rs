//! Driving ports for producing, reading and restoring backups.

use async_trait::async_trait;

use crate::domain::{Backup, BackupId, BackupKind, Error, UserId, VersionedDocument};

/// Backup production and restore use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupCommand: Send + Sync {
    /// Capture the current document as a new backup.
    ///
    /// Reads without locking and never changes the document.
    async fn create_snapshot(&self, kind: BackupKind, source: &str) -> Result<Backup, Error>;

    /// Create a startup backup when none exist yet.
    ///
    /// Returns the backup created, or `None` when one already existed.
    async fn ensure_initial_backup(&self) -> Result<Option<Backup>, Error>;

    /// Write a backup's content as the next document version.
    async fn restore_backup(
        &self,
        backup_id: BackupId,
        user_id: Option<UserId>,
    ) -> Result<VersionedDocument, Error>;
}

/// Backup read use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupQuery: Send + Sync {
    /// All backups, newest first.
    async fn list_backups(&self) -> Result<Vec<Backup>, Error>;

    /// One backup, or a `not_found` error.
    async fn get_backup(&self, backup_id: BackupId) -> Result<Backup, Error>;

    /// The most recent backup, if any.
    async fn latest_backup(&self) -> Result<Option<Backup>, Error>;
}
