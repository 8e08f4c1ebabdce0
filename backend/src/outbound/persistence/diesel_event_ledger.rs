//! PostgreSQL-backed `EventLedger` implementation using Diesel ORM.
//!
//! Reads serve the `/events` and entity history endpoints. Entries are
//! written by `DieselBoardStateRepository` in the document transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{EventLedger, EventLedgerError};
use crate::domain::{EntityEvent, EntityEventId, EntityId, LedgerEntry};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::ledger_rows::{row_to_entity_event, row_to_entry};
use super::models::{EntityEventRow, StateEventRow};
use super::pool::{DbPool, PoolError};
use super::schema::{entity_events, state_events};

/// Diesel-backed implementation of the `EventLedger` port.
#[derive(Clone)]
pub struct DieselEventLedger {
    pool: DbPool,
}

impl DieselEventLedger {
    /// Create a new ledger adapter with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EventLedgerError {
    map_basic_pool_error(error, EventLedgerError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> EventLedgerError {
    map_basic_diesel_error(error, EventLedgerError::query, EventLedgerError::connection)
}

fn collect_rows<R, T>(
    rows: Vec<R>,
    convert: fn(R) -> Result<T, String>,
) -> Result<Vec<T>, EventLedgerError> {
    rows.into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()
        .map_err(EventLedgerError::corrupt)
}

#[async_trait]
impl EventLedger for DieselEventLedger {
    async fn list(&self) -> Result<Vec<LedgerEntry>, EventLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<StateEventRow> = state_events::table
            .select(StateEventRow::as_select())
            .order_by((state_events::created_at.asc(), state_events::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        collect_rows(rows, row_to_entry)
    }

    async fn history_for(
        &self,
        project_id: &EntityId,
    ) -> Result<Vec<EntityEvent>, EventLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<EntityEventRow> = entity_events::table
            .filter(entity_events::project_id.eq(project_id.as_str()))
            .select(EntityEventRow::as_select())
            .order_by((entity_events::created_at.desc(), entity_events::id.desc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        collect_rows(rows, row_to_entity_event)
    }

    async fn find_entity_event(
        &self,
        id: EntityEventId,
    ) -> Result<Option<EntityEvent>, EventLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        entity_events::table
            .filter(entity_events::id.eq(id.get()))
            .select(EntityEventRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_entity_event)
            .transpose()
            .map_err(EventLedgerError::corrupt)
    }
}
