//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::{board_state, entity_events, state_backups, state_events};

// ---------------------------------------------------------------------------
// Board document
// ---------------------------------------------------------------------------

/// Row struct for reading the board document.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = board_state)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BoardStateRow {
    pub data: Option<Value>,
    pub version: i64,
}

/// Insertable struct for creating the empty singleton row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = board_state)]
pub(crate) struct NewBoardStateRow<'a> {
    pub id: &'a str,
    pub data: Option<Value>,
    pub version: i64,
}

/// Changeset applied by an accepted write.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = board_state)]
pub(crate) struct BoardStateUpdate<'a> {
    pub data: &'a Value,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Row struct for reading ledger entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = state_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StateEventRow {
    pub id: i64,
    pub client_request_id: String,
    pub version: i64,
    pub data: Value,
    pub payload_hash: Vec<u8>,
    pub origin: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for appending a ledger entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = state_events)]
pub(crate) struct NewStateEventRow<'a> {
    pub client_request_id: &'a str,
    pub version: i64,
    pub data: &'a Value,
    pub payload_hash: &'a [u8],
    pub origin: &'a str,
    pub user_id: Option<Uuid>,
}

/// Row struct for reading entity events.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = entity_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EntityEventRow {
    pub id: i64,
    pub ledger_event_id: i64,
    pub project_id: String,
    pub user_id: Option<Uuid>,
    pub action_type: String,
    pub payload: Value,
    pub snapshot_after: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for recording one derived entity change.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = entity_events)]
pub(crate) struct NewEntityEventRow<'a> {
    pub ledger_event_id: i64,
    pub project_id: &'a str,
    pub user_id: Option<Uuid>,
    pub action_type: &'a str,
    pub payload: &'a Value,
    pub snapshot_after: Option<&'a Value>,
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// Row struct for reading backups.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = state_backups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StateBackupRow {
    pub id: i64,
    pub snapshot: Value,
    pub kind: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for storing a backup.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = state_backups)]
pub(crate) struct NewStateBackupRow<'a> {
    pub snapshot: &'a Value,
    pub kind: &'a str,
    pub source: &'a str,
}
