//! Ledger row writes and row-to-domain conversions shared by the document
//! store and the ledger adapter.

use std::str::FromStr;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{
    ActionType, Backup, BackupId, BackupKind, BoardDocument, ClientRequestId, EntityChange,
    EntityEvent, EntityEventId, EntityId, LedgerEntry, LedgerEntryId, NewLedgerEntry,
    PayloadFingerprint, StateVersion, UserId,
};

use super::models::{
    EntityEventRow, NewEntityEventRow, NewStateEventRow, StateBackupRow, StateEventRow,
};
use super::schema::{entity_events, state_events};

/// Convert a domain version into its column value.
pub(super) fn version_to_db(version: StateVersion) -> Result<i64, String> {
    i64::try_from(version).map_err(|_| format!("version {version} exceeds the column range"))
}

/// Convert a stored version into the domain type.
pub(super) fn version_from_db(version: i64) -> Result<StateVersion, String> {
    StateVersion::try_from(version).map_err(|_| format!("negative version {version} in storage"))
}

/// Look up the entry recorded for a token on an existing connection.
pub(super) async fn find_entry_row(
    conn: &mut AsyncPgConnection,
    client_request_id: &ClientRequestId,
) -> QueryResult<Option<StateEventRow>> {
    state_events::table
        .filter(state_events::client_request_id.eq(client_request_id.as_ref()))
        .select(StateEventRow::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a ledger entry and its entity events.
///
/// Returns the new entry id, or `None` when the token was already taken.
/// Callers run this inside a transaction.
pub(super) async fn insert_entry(
    conn: &mut AsyncPgConnection,
    entry: &NewLedgerEntry,
    data: &serde_json::Value,
    changes: &[EntityChange],
) -> QueryResult<Option<i64>> {
    let version = version_to_db(entry.version)
        .map_err(|message| diesel::result::Error::QueryBuilderError(message.into()))?;
    let user_id = entry.user_id.as_ref().map(|id| *id.as_uuid());
    let new_row = NewStateEventRow {
        client_request_id: entry.client_request_id.as_ref(),
        version,
        data,
        payload_hash: entry.payload_hash.as_bytes(),
        origin: entry.origin.kind(),
        user_id,
    };

    let inserted: Option<i64> = diesel::insert_into(state_events::table)
        .values(&new_row)
        .on_conflict(state_events::client_request_id)
        .do_nothing()
        .returning(state_events::id)
        .get_result(conn)
        .await
        .optional()?;

    let Some(ledger_event_id) = inserted else {
        return Ok(None);
    };

    if !changes.is_empty() {
        let rows: Vec<NewEntityEventRow<'_>> = changes
            .iter()
            .map(|change| NewEntityEventRow {
                ledger_event_id,
                project_id: change.project_id.as_str(),
                user_id,
                action_type: change.action_type.as_str(),
                payload: &change.payload,
                snapshot_after: change.snapshot_after.as_ref(),
            })
            .collect();
        diesel::insert_into(entity_events::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    Ok(Some(ledger_event_id))
}

/// Convert a ledger row into the domain entry.
pub(super) fn row_to_entry(row: StateEventRow) -> Result<LedgerEntry, String> {
    let client_request_id = ClientRequestId::new(&row.client_request_id)
        .map_err(|err| format!("ledger entry {}: invalid token: {err}", row.id))?;
    let version = version_from_db(row.version)?;
    let data = BoardDocument::from_value(row.data)
        .map_err(|err| format!("ledger entry {}: invalid document: {err}", row.id))?;
    let payload_hash = PayloadFingerprint::try_from_bytes(&row.payload_hash)
        .map_err(|err| format!("ledger entry {}: {err}", row.id))?;

    Ok(LedgerEntry {
        id: LedgerEntryId::new(row.id),
        client_request_id,
        version,
        data,
        payload_hash,
        origin: row.origin,
        user_id: row.user_id.map(UserId::from_uuid),
        created_at: row.created_at,
    })
}

/// Convert an entity event row into the domain event.
pub(super) fn row_to_entity_event(row: EntityEventRow) -> Result<EntityEvent, String> {
    let project_id = EntityId::new(row.project_id)
        .ok_or_else(|| format!("entity event {}: blank project id", row.id))?;
    let action_type = ActionType::from_str(&row.action_type)
        .map_err(|err| format!("entity event {}: {err}", row.id))?;

    Ok(EntityEvent {
        id: EntityEventId::new(row.id),
        ledger_entry_id: LedgerEntryId::new(row.ledger_event_id),
        project_id,
        user_id: row.user_id.map(UserId::from_uuid),
        action_type,
        payload: row.payload,
        snapshot_after: row.snapshot_after,
        created_at: row.created_at,
    })
}

/// Convert a backup row into the domain backup.
pub(super) fn row_to_backup(row: StateBackupRow) -> Result<Backup, String> {
    let kind = BackupKind::from_str(&row.kind).map_err(|err| format!("backup {}: {err}", row.id))?;
    Ok(Backup {
        id: BackupId::new(row.id),
        snapshot: row.snapshot,
        kind,
        source: row.source,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage.
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn ledger_row() -> StateEventRow {
        StateEventRow {
            id: 3,
            client_request_id: "req-1".to_owned(),
            version: 2,
            data: json!({ "projects": [{ "id": "p1" }] }),
            payload_hash: vec![7; 32],
            origin: "client".to_owned(),
            user_id: Some(Uuid::nil()),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn ledger_rows_convert_to_entries() {
        let entry = row_to_entry(ledger_row()).expect("valid row");
        assert_eq!(entry.id, LedgerEntryId::new(3));
        assert_eq!(entry.version, StateVersion::new(2));
        assert_eq!(entry.client_request_id.as_ref(), "req-1");
        assert_eq!(entry.data.projects().len(), 1);
        assert!(entry.user_id.is_some());
    }

    #[rstest]
    fn truncated_fingerprints_are_rejected() {
        let mut row = ledger_row();
        row.payload_hash = vec![1; 4];
        let error = row_to_entry(row).expect_err("short hash");
        assert!(error.contains("32 bytes"));
    }

    #[rstest]
    fn negative_versions_are_rejected() {
        let mut row = ledger_row();
        row.version = -1;
        assert!(row_to_entry(row).is_err());
    }

    #[rstest]
    #[case("create", true)]
    #[case("restore", true)]
    #[case("rename", false)]
    fn entity_rows_require_known_actions(#[case] action: &str, #[case] valid: bool) {
        let row = EntityEventRow {
            id: 1,
            ledger_event_id: 3,
            project_id: "p1".to_owned(),
            user_id: None,
            action_type: action.to_owned(),
            payload: json!({}),
            snapshot_after: None,
            created_at: Utc::now(),
        };
        assert_eq!(row_to_entity_event(row).is_ok(), valid);
    }

    #[rstest]
    #[case("on-demand", BackupKind::Manual)]
    #[case("hourly", BackupKind::Hourly)]
    fn backup_rows_accept_stored_kinds(#[case] kind: &str, #[case] expected: BackupKind) {
        let row = StateBackupRow {
            id: 9,
            snapshot: json!({ "projects": [], "version": 4 }),
            kind: kind.to_owned(),
            source: "scheduler".to_owned(),
            created_at: Utc::now(),
        };
        let backup = row_to_backup(row).expect("valid row");
        assert_eq!(backup.kind, expected);
        assert_eq!(backup.captured_version(), Some(4));
    }
}
