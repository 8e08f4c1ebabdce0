//! Board state domain service.
//!
//! Implements the read and write driving ports for the board document:
//! cached reads, compare-and-write saves with idempotent replay, ledger
//! listing, and entity-scoped restore through the same versioned-write path.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::board_service_support::StateWriter;
use crate::domain::ports::{
    BoardStateCommand, BoardStateQuery, BoardStateRepository, EventLedger, NoOpStateCache,
    NoOpStateWriteMetrics, RestoreEntityRequest, SaveStateRequest, SaveStateResponse, StateCache,
    StateWriteMetrics, VersionedWrite,
};
use crate::domain::{
    BoardDocument, ChangeOrigin, ClientRequestId, EntityEvent, EntityId, Error, LedgerEntry,
    VersionedDocument,
};

/// Board state service implementing the document driving ports.
pub struct BoardStateService<R, L> {
    writer: StateWriter<R>,
    ledger: Arc<L>,
}

impl<R, L> BoardStateService<R, L>
where
    R: BoardStateRepository,
    L: EventLedger,
{
    /// Create a service with an explicit cache and metrics recorder.
    pub fn new(
        repository: Arc<R>,
        ledger: Arc<L>,
        cache: Arc<dyn StateCache>,
        metrics: Arc<dyn StateWriteMetrics>,
    ) -> Self {
        Self {
            writer: StateWriter::new(repository, cache, metrics),
            ledger,
        }
    }

    /// Create a service without caching or metrics.
    pub fn uncached(repository: Arc<R>, ledger: Arc<L>) -> Self {
        Self::new(
            repository,
            ledger,
            Arc::new(NoOpStateCache),
            Arc::new(NoOpStateWriteMetrics),
        )
    }

    fn apply_snapshot(
        document: &mut BoardDocument,
        event: &EntityEvent,
    ) -> Result<(), Error> {
        match &event.snapshot_after {
            Some(snapshot) => document.upsert_project(snapshot.clone()).map_err(|err| {
                Error::internal(format!(
                    "entity event {} holds an unusable snapshot: {err}",
                    event.id
                ))
            }),
            None => {
                document.remove_project(&event.project_id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<R, L> BoardStateQuery for BoardStateService<R, L>
where
    R: BoardStateRepository,
    L: EventLedger,
{
    async fn fetch(&self) -> Result<Option<VersionedDocument>, Error> {
        match self.writer.cache().get().await {
            Ok(Some(cached)) if cached.version >= self.writer.committed_floor() => {
                return Ok(Some(cached));
            }
            Ok(Some(cached)) => {
                debug!(cached = %cached.version, "ignoring superseded cached board document");
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "board state cache read failed; falling back to storage"),
        }

        let loaded = self
            .writer
            .repository()
            .load()
            .await
            .map_err(Error::from)?;
        // A commit may have landed while the load was in flight.
        let fresh = loaded
            .as_ref()
            .filter(|document| document.version >= self.writer.committed_floor());
        if let Some(document) = fresh {
            if let Err(error) = self.writer.cache().set(document).await {
                warn!(%error, "failed to populate board state cache");
            }
        }
        Ok(loaded)
    }

    async fn list_entries(&self) -> Result<Vec<LedgerEntry>, Error> {
        self.ledger.list().await.map_err(Error::from)
    }

    async fn entity_history(&self, project_id: &EntityId) -> Result<Vec<EntityEvent>, Error> {
        self.ledger
            .history_for(project_id)
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl<R, L> BoardStateCommand for BoardStateService<R, L>
where
    R: BoardStateRepository,
    L: EventLedger,
{
    async fn save(&self, request: SaveStateRequest) -> Result<SaveStateResponse, Error> {
        let SaveStateRequest {
            document,
            expected_version,
            client_request_id,
            user_id,
        } = request;
        self.writer
            .commit(VersionedWrite {
                document,
                expected_version,
                client_request_id,
                origin: ChangeOrigin::Client,
                user_id,
            })
            .await
    }

    async fn restore_entity(
        &self,
        request: RestoreEntityRequest,
    ) -> Result<VersionedDocument, Error> {
        let RestoreEntityRequest {
            project_id,
            event_id,
            user_id,
        } = request;
        let event = self
            .ledger
            .find_entity_event(event_id)
            .await
            .map_err(Error::from)?
            .filter(|event| event.project_id == project_id)
            .ok_or_else(|| {
                Error::not_found(format!("event {event_id} not found for entity {project_id}"))
            })?;

        self.writer
            .commit_against_current(|current| {
                let mut document = current.document;
                Self::apply_snapshot(&mut document, &event)?;
                Ok(VersionedWrite {
                    document,
                    expected_version: current.version,
                    client_request_id: ClientRequestId::server_generated("restore-entity"),
                    origin: ChangeOrigin::EntityRestore {
                        project_id: project_id.clone(),
                        source_event_id: event_id,
                    },
                    user_id: user_id.clone(),
                })
            })
            .await
    }
}

#[cfg(test)]
#[path = "board_state_service_tests.rs"]
mod tests;
