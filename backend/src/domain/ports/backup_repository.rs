//! Port abstraction for backup storage.

use async_trait::async_trait;

use crate::domain::{Backup, BackupId, NewBackup};

use super::define_port_error;

define_port_error! {
    /// Errors raised by backup storage adapters.
    pub enum BackupRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => service_unavailable: "backup repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => internal: "backup repository query failed: {message}",
        /// A stored row could not be interpreted.
        Corrupt { message: String } => internal: "stored backup is invalid: {message}",
    }
}

/// Backup storage. Backups are insert-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Store a new backup and return it with its assigned id.
    async fn insert(&self, backup: &NewBackup) -> Result<Backup, BackupRepositoryError>;

    /// All backups, newest first: `(created_at, id)` descending.
    async fn list(&self) -> Result<Vec<Backup>, BackupRepositoryError>;

    /// Look up one backup.
    async fn find(&self, id: BackupId) -> Result<Option<Backup>, BackupRepositoryError>;

    /// The most recent backup, if any.
    async fn latest(&self) -> Result<Option<Backup>, BackupRepositoryError>;

    /// Number of stored backups.
    async fn count(&self) -> Result<u64, BackupRepositoryError>;
}
