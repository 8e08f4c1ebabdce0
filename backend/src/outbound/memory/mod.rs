//! In-process board store used when no database is configured.
//!
//! Implements the document, ledger and backup ports over one mutex-guarded
//! state so a compare-and-write sees the same atomicity the PostgreSQL
//! transaction provides. Nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::Mutex;

use crate::domain::ports::{
    BackupRepository, BackupRepositoryError, BoardStateRepository,
    BoardStateRepositoryError, CommitOutcome, EventLedger, EventLedgerError, VersionedWrite,
};
use crate::domain::{
    Backup, BackupId, ClientRequestId, EntityChange, EntityEvent, EntityEventId, EntityId,
    LedgerEntry, LedgerEntryId, NewBackup, NewLedgerEntry, PayloadFingerprint, StateVersion,
    VersionedDocument, derive_entity_changes,
};

#[derive(Default)]
struct StoreState {
    document: Option<VersionedDocument>,
    entries: Vec<LedgerEntry>,
    events: Vec<EntityEvent>,
    backups: Vec<Backup>,
}

impl StoreState {
    fn find_entry(&self, token: &ClientRequestId) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|entry| &entry.client_request_id == token)
    }

    fn append(
        &mut self,
        entry: &NewLedgerEntry,
        changes: &[EntityChange],
        clock: &dyn Clock,
    ) -> Option<LedgerEntryId> {
        if self.find_entry(&entry.client_request_id).is_some() {
            return None;
        }
        let created_at = clock.utc();
        let ledger_entry_id = LedgerEntryId::new(next_id(self.entries.len()));
        self.entries.push(LedgerEntry {
            id: ledger_entry_id,
            client_request_id: entry.client_request_id.clone(),
            version: entry.version,
            data: entry.data.clone(),
            payload_hash: entry.payload_hash.clone(),
            origin: entry.origin.kind().to_owned(),
            user_id: entry.user_id.clone(),
            created_at,
        });
        for change in changes {
            let id = EntityEventId::new(next_id(self.events.len()));
            self.events.push(EntityEvent::from_change(
                id,
                ledger_entry_id,
                entry.user_id.clone(),
                change.clone(),
                created_at,
            ));
        }
        Some(ledger_entry_id)
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).map_or(i64::MAX, |count| count.saturating_add(1))
}

/// Mutex-guarded implementation of the board persistence ports.
pub struct InMemoryBoardStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBoardStore {
    /// Create an empty store stamping records with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }
}

impl Default for InMemoryBoardStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

#[async_trait]
impl BoardStateRepository for InMemoryBoardStore {
    async fn load(&self) -> Result<Option<VersionedDocument>, BoardStateRepositoryError> {
        Ok(self.state.lock().await.document.clone())
    }

    async fn commit(
        &self,
        write: VersionedWrite,
    ) -> Result<CommitOutcome, BoardStateRepositoryError> {
        let mut state = self.state.lock().await;
        let fingerprint = PayloadFingerprint::of(&write.document);

        if let Some(existing) = state.find_entry(&write.client_request_id) {
            return Ok(CommitOutcome::Replayed {
                version: existing.version,
                payload_matches: existing.payload_hash == fingerprint,
            });
        }

        let current_version = state
            .document
            .as_ref()
            .map_or(StateVersion::INITIAL, |doc| doc.version);
        if current_version != write.expected_version {
            return Ok(CommitOutcome::Conflict { current_version });
        }

        let next_version = current_version.next();
        let changes = derive_entity_changes(
            state.document.as_ref().map(|doc| &doc.document),
            &write.document,
            &write.origin,
        );
        let entry = NewLedgerEntry {
            client_request_id: write.client_request_id,
            version: next_version,
            data: write.document,
            payload_hash: fingerprint,
            origin: write.origin,
            user_id: write.user_id,
        };
        let ledger_entry_id = state
            .append(&entry, &changes, self.clock.as_ref())
            .ok_or_else(|| {
                BoardStateRepositoryError::duplicate_vanished(entry.client_request_id.to_string())
            })?;
        state.document = Some(VersionedDocument::new(entry.data, next_version));

        Ok(CommitOutcome::Committed {
            version: next_version,
            ledger_entry_id,
        })
    }
}

#[async_trait]
impl EventLedger for InMemoryBoardStore {
    async fn list(&self) -> Result<Vec<LedgerEntry>, EventLedgerError> {
        let mut entries = self.state.lock().await.entries.clone();
        entries.sort_by_key(|entry| (entry.created_at, entry.id));
        Ok(entries)
    }

    async fn history_for(
        &self,
        project_id: &EntityId,
    ) -> Result<Vec<EntityEvent>, EventLedgerError> {
        let mut history: Vec<EntityEvent> = self
            .state
            .lock()
            .await
            .events
            .iter()
            .filter(|event| &event.project_id == project_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(history)
    }

    async fn find_entity_event(
        &self,
        id: EntityEventId,
    ) -> Result<Option<EntityEvent>, EventLedgerError> {
        Ok(self
            .state
            .lock()
            .await
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned())
    }
}

#[async_trait]
impl BackupRepository for InMemoryBoardStore {
    async fn insert(&self, backup: &NewBackup) -> Result<Backup, BackupRepositoryError> {
        let mut state = self.state.lock().await;
        let stored = Backup {
            id: BackupId::new(next_id(state.backups.len())),
            snapshot: backup.snapshot.to_value(),
            kind: backup.kind,
            source: backup.source.clone(),
            created_at: self.clock.utc(),
        };
        state.backups.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<Backup>, BackupRepositoryError> {
        let mut backups = self.state.lock().await.backups.clone();
        backups.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(backups)
    }

    async fn find(&self, id: BackupId) -> Result<Option<Backup>, BackupRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .backups
            .iter()
            .find(|backup| backup.id == id)
            .cloned())
    }

    async fn latest(&self) -> Result<Option<Backup>, BackupRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .backups
            .iter()
            .max_by_key(|backup| (backup.created_at, backup.id))
            .cloned())
    }

    async fn count(&self) -> Result<u64, BackupRepositoryError> {
        let len = self.state.lock().await.backups.len();
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests;
