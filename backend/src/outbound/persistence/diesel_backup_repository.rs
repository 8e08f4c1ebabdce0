//! PostgreSQL-backed `BackupRepository` implementation using Diesel ORM.
//!
//! Backups are insert-only and never pruned.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BackupRepository, BackupRepositoryError};
use crate::domain::{Backup, BackupId, NewBackup};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::ledger_rows::row_to_backup;
use super::models::{NewStateBackupRow, StateBackupRow};
use super::pool::{DbPool, PoolError};
use super::schema::state_backups;

/// Diesel-backed implementation of the `BackupRepository` port.
#[derive(Clone)]
pub struct DieselBackupRepository {
    pool: DbPool,
}

impl DieselBackupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BackupRepositoryError {
    map_basic_pool_error(error, BackupRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> BackupRepositoryError {
    map_basic_diesel_error(
        error,
        BackupRepositoryError::query,
        BackupRepositoryError::connection,
    )
}

#[async_trait]
impl BackupRepository for DieselBackupRepository {
    async fn insert(&self, backup: &NewBackup) -> Result<Backup, BackupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let snapshot = backup.snapshot.to_value();

        let row: StateBackupRow = diesel::insert_into(state_backups::table)
            .values(&NewStateBackupRow {
                snapshot: &snapshot,
                kind: backup.kind.as_str(),
                source: backup.source.as_str(),
            })
            .returning(StateBackupRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        row_to_backup(row).map_err(BackupRepositoryError::corrupt)
    }

    async fn list(&self) -> Result<Vec<Backup>, BackupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<StateBackupRow> = state_backups::table
            .select(StateBackupRow::as_select())
            .order_by((state_backups::created_at.desc(), state_backups::id.desc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(row_to_backup)
            .collect::<Result<Vec<_>, _>>()
            .map_err(BackupRepositoryError::corrupt)
    }

    async fn find(&self, id: BackupId) -> Result<Option<Backup>, BackupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        state_backups::table
            .filter(state_backups::id.eq(id.get()))
            .select(StateBackupRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_backup)
            .transpose()
            .map_err(BackupRepositoryError::corrupt)
    }

    async fn latest(&self) -> Result<Option<Backup>, BackupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        state_backups::table
            .select(StateBackupRow::as_select())
            .order_by((state_backups::created_at.desc(), state_backups::id.desc()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_backup)
            .transpose()
            .map_err(BackupRepositoryError::corrupt)
    }

    async fn count(&self) -> Result<u64, BackupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total: i64 = state_backups::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        u64::try_from(total)
            .map_err(|_| BackupRepositoryError::query(format!("negative backup count {total}")))
    }
}
