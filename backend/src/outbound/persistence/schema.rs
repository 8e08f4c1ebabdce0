//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// The versioned board document.
    ///
    /// Exactly one row is live, keyed by a fixed identifier. The row is
    /// locked `FOR UPDATE` only for the compare-and-write step.
    board_state (id) {
        /// Fixed singleton key.
        id -> Text,
        /// Normalized document; `NULL` until the first write.
        data -> Nullable<Jsonb>,
        /// Monotonic version counter, `0` before the first write.
        version -> Int8,
        /// Timestamp of the last accepted write.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only ledger of accepted writes.
    state_events (id) {
        /// Sequence identifier.
        id -> Int8,
        /// Idempotency token; unique across the ledger.
        client_request_id -> Text,
        /// Version produced by the write.
        version -> Int8,
        /// Document as written.
        data -> Jsonb,
        /// SHA-256 fingerprint of `data`.
        payload_hash -> Bytea,
        /// `client`, `entity_restore` or `backup_restore`.
        origin -> Text,
        /// Author, when known.
        user_id -> Nullable<Uuid>,
        /// Acceptance timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-project changes derived from each ledger entry.
    entity_events (id) {
        /// Sequence identifier.
        id -> Int8,
        /// Ledger entry that produced the change.
        ledger_event_id -> Int8,
        /// Project identity.
        project_id -> Text,
        /// Author, when known.
        user_id -> Nullable<Uuid>,
        /// `create`, `update`, `delete` or `restore`.
        action_type -> Text,
        /// Diff metadata.
        payload -> Jsonb,
        /// Project after the change; `NULL` once deleted.
        snapshot_after -> Nullable<Jsonb>,
        /// Recording timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Insert-only point-in-time copies of the document.
    state_backups (id) {
        /// Sequence identifier.
        id -> Int8,
        /// Served form of the document with its version.
        snapshot -> Jsonb,
        /// `startup`, `hourly`, `daily` or `manual`.
        kind -> Text,
        /// Who or what requested the backup.
        source -> Text,
        /// Capture timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(entity_events -> state_events (ledger_event_id));

diesel::allow_tables_to_appear_in_same_query!(board_state, entity_events, state_backups, state_events,);
