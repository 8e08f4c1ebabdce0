//! PostgreSQL-backed `BoardStateRepository` implementation using Diesel ORM.
//!
//! The compare-and-write runs in one transaction:
//!
//! 1. ensure the singleton row exists (`ON CONFLICT DO NOTHING`);
//! 2. lock it with `SELECT ... FOR UPDATE`;
//! 3. answer a known token from the ledger without writing;
//! 4. compare the stored version with the expected one;
//! 5. append the ledger entry (`ON CONFLICT DO NOTHING RETURNING id`) and
//!    the derived entity events;
//! 6. update the document and version.
//!
//! Any error rolls the whole transaction back. Plain reads never lock.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{
    BoardStateRepository, BoardStateRepositoryError, CommitOutcome, VersionedWrite,
};
use crate::domain::{
    BoardDocument, LedgerEntryId, NewLedgerEntry, PayloadFingerprint, StateVersion,
    VersionedDocument, derive_entity_changes,
};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::ledger_rows::{find_entry_row, insert_entry, version_from_db, version_to_db};
use super::models::{BoardStateRow, BoardStateUpdate, NewBoardStateRow, StateEventRow};
use super::pool::{DbPool, PoolError};
use super::schema::board_state;

/// Key of the singleton document row.
pub const BOARD_STATE_KEY: &str = "board";

/// Diesel-backed implementation of the `BoardStateRepository` port.
#[derive(Clone)]
pub struct DieselBoardStateRepository {
    pool: DbPool,
}

impl DieselBoardStateRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BoardStateRepositoryError {
    map_basic_pool_error(error, BoardStateRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> BoardStateRepositoryError {
    map_basic_diesel_error(
        error,
        BoardStateRepositoryError::query,
        BoardStateRepositoryError::connection,
    )
}

/// Failure inside the commit transaction.
#[derive(Debug)]
enum CommitError {
    Diesel(diesel::result::Error),
    Corrupt(String),
    DuplicateVanished(String),
}

impl From<diesel::result::Error> for CommitError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<CommitError> for BoardStateRepositoryError {
    fn from(error: CommitError) -> Self {
        match error {
            CommitError::Diesel(error) => map_diesel_error(error),
            CommitError::Corrupt(message) => Self::corrupt(message),
            CommitError::DuplicateVanished(token) => Self::duplicate_vanished(token),
        }
    }
}

fn row_to_document(row: BoardStateRow) -> Result<Option<VersionedDocument>, String> {
    let Some(data) = row.data else {
        return Ok(None);
    };
    let version = version_from_db(row.version)?;
    let document = BoardDocument::from_value(data)
        .map_err(|err| format!("stored document is invalid: {err}"))?;
    Ok(Some(VersionedDocument::new(document, version)))
}

fn replay(row: StateEventRow, fingerprint: &PayloadFingerprint) -> Result<CommitOutcome, CommitError> {
    let version = version_from_db(row.version).map_err(CommitError::Corrupt)?;
    Ok(CommitOutcome::Replayed {
        version,
        payload_matches: row.payload_hash.as_slice() == fingerprint.as_bytes().as_slice(),
    })
}

async fn commit_locked(
    conn: &mut AsyncPgConnection,
    write: VersionedWrite,
) -> Result<CommitOutcome, CommitError> {
    diesel::insert_into(board_state::table)
        .values(&NewBoardStateRow {
            id: BOARD_STATE_KEY,
            data: None,
            version: 0,
        })
        .on_conflict(board_state::id)
        .do_nothing()
        .execute(conn)
        .await?;

    let current: BoardStateRow = board_state::table
        .filter(board_state::id.eq(BOARD_STATE_KEY))
        .select(BoardStateRow::as_select())
        .for_update()
        .get_result(conn)
        .await?;

    let fingerprint = PayloadFingerprint::of(&write.document);
    if let Some(existing) = find_entry_row(conn, &write.client_request_id).await? {
        return replay(existing, &fingerprint);
    }

    let current_version = version_from_db(current.version).map_err(CommitError::Corrupt)?;
    if current_version != write.expected_version {
        return Ok(CommitOutcome::Conflict { current_version });
    }

    let previous = row_to_document(current).map_err(CommitError::Corrupt)?;
    let next_version = current_version.next();
    let changes = derive_entity_changes(
        previous.as_ref().map(|doc| &doc.document),
        &write.document,
        &write.origin,
    );
    let data = write.document.to_value();
    let entry = NewLedgerEntry {
        client_request_id: write.client_request_id,
        version: next_version,
        data: write.document,
        payload_hash: fingerprint,
        origin: write.origin,
        user_id: write.user_id,
    };

    let Some(ledger_entry_id) = insert_entry(conn, &entry, &data, &changes).await? else {
        // A concurrent writer recorded the token after the pre-check.
        return match find_entry_row(conn, &entry.client_request_id).await? {
            Some(existing) => replay(existing, &entry.payload_hash),
            None => Err(CommitError::DuplicateVanished(
                entry.client_request_id.to_string(),
            )),
        };
    };

    let stored_version = version_to_db(next_version).map_err(CommitError::Corrupt)?;
    diesel::update(board_state::table.filter(board_state::id.eq(BOARD_STATE_KEY)))
        .set(&BoardStateUpdate {
            data: &data,
            version: stored_version,
            updated_at: Utc::now(),
        })
        .execute(conn)
        .await?;

    debug!(
        version = %next_version,
        ledger_entry_id,
        changes = changes.len(),
        "board state row updated"
    );
    Ok(CommitOutcome::Committed {
        version: next_version,
        ledger_entry_id: LedgerEntryId::new(ledger_entry_id),
    })
}

#[async_trait]
impl BoardStateRepository for DieselBoardStateRepository {
    async fn load(&self) -> Result<Option<VersionedDocument>, BoardStateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<BoardStateRow> = board_state::table
            .filter(board_state::id.eq(BOARD_STATE_KEY))
            .select(BoardStateRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match row {
            None => Ok(None),
            Some(row) => row_to_document(row).map_err(BoardStateRepositoryError::corrupt),
        }
    }

    async fn commit(
        &self,
        write: VersionedWrite,
    ) -> Result<CommitOutcome, BoardStateRepositoryError> {
        let expected: StateVersion = write.expected_version;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let outcome = conn
            .transaction(|conn| async move { commit_locked(conn, write).await }.scope_boxed())
            .await
            .map_err(BoardStateRepositoryError::from)?;

        debug!(expected = %expected, ?outcome, "board state commit finished");
        Ok(outcome)
    }
}
