//! Backup domain service.
//!
//! Captures the current document into insert-only backups and restores a
//! backup by writing its content as the next document version. Restores go
//! through the same versioned-write path as client saves so they are
//! ledgered, change-derived and cache-invalidated like any other write.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::board_service_support::StateWriter;
use crate::domain::ports::{
    BackupCommand, BackupQuery, BackupRepository, BoardStateRepository, NoOpStateCache,
    NoOpStateWriteMetrics, StateCache, StateWriteMetrics, VersionedWrite,
};
use crate::domain::{
    Backup, BackupId, BackupKind, BoardDocument, ChangeOrigin, ClientRequestId, Error, NewBackup,
    UserId, VersionedDocument,
};

/// Source recorded for backups taken at startup.
pub const STARTUP_BACKUP_SOURCE: &str = "startup";

/// Backup service implementing the backup driving ports.
pub struct BackupService<B, R> {
    backups: Arc<B>,
    writer: StateWriter<R>,
}

impl<B, R> BackupService<B, R>
where
    B: BackupRepository,
    R: BoardStateRepository,
{
    /// Create a service sharing the document store's cache and metrics.
    pub fn new(
        backups: Arc<B>,
        repository: Arc<R>,
        cache: Arc<dyn StateCache>,
        metrics: Arc<dyn StateWriteMetrics>,
    ) -> Self {
        Self {
            backups,
            writer: StateWriter::new(repository, cache, metrics),
        }
    }

    /// Create a service without caching or metrics.
    pub fn uncached(backups: Arc<B>, repository: Arc<R>) -> Self {
        Self::new(
            backups,
            repository,
            Arc::new(NoOpStateCache),
            Arc::new(NoOpStateWriteMetrics),
        )
    }

}

#[async_trait]
impl<B, R> BackupCommand for BackupService<B, R>
where
    B: BackupRepository,
    R: BoardStateRepository,
{
    async fn create_snapshot(&self, kind: BackupKind, source: &str) -> Result<Backup, Error> {
        let snapshot = self.writer.load_or_empty().await?;
        let backup = self
            .backups
            .insert(&NewBackup {
                snapshot,
                kind,
                source: source.to_owned(),
            })
            .await
            .map_err(Error::from)?;
        info!(
            backup_id = %backup.id,
            kind = kind.as_str(),
            source,
            version = backup.captured_version(),
            "board state backup created"
        );
        Ok(backup)
    }

    async fn ensure_initial_backup(&self) -> Result<Option<Backup>, Error> {
        let existing = self.backups.count().await.map_err(Error::from)?;
        if existing > 0 {
            return Ok(None);
        }
        self.create_snapshot(BackupKind::Startup, STARTUP_BACKUP_SOURCE)
            .await
            .map(Some)
    }

    async fn restore_backup(
        &self,
        backup_id: BackupId,
        user_id: Option<UserId>,
    ) -> Result<VersionedDocument, Error> {
        let backup = self.get_backup(backup_id).await?;
        let document = BoardDocument::from_value(backup.snapshot).map_err(|err| {
            Error::internal(format!("backup {backup_id} holds an unusable snapshot: {err}"))
        })?;

        let restored = self
            .writer
            .commit_against_current(|current| {
                Ok(VersionedWrite {
                    document: document.clone(),
                    expected_version: current.version,
                    client_request_id: ClientRequestId::server_generated("restore-backup"),
                    origin: ChangeOrigin::BackupRestore { backup_id },
                    user_id: user_id.clone(),
                })
            })
            .await?;
        info!(%backup_id, version = %restored.version, "board state restored from backup");
        Ok(restored)
    }
}

#[async_trait]
impl<B, R> BackupQuery for BackupService<B, R>
where
    B: BackupRepository,
    R: BoardStateRepository,
{
    async fn list_backups(&self) -> Result<Vec<Backup>, Error> {
        self.backups.list().await.map_err(Error::from)
    }

    async fn get_backup(&self, backup_id: BackupId) -> Result<Backup, Error> {
        self.backups
            .find(backup_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("backup {backup_id} not found")))
    }

    async fn latest_backup(&self) -> Result<Option<Backup>, Error> {
        self.backups.latest().await.map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "backup_service_tests.rs"]
mod tests;
