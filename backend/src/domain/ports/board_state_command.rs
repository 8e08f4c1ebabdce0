//! Driving port for mutating the board document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    BoardDocument, ClientRequestId, EntityEventId, EntityId, Error, StateVersion, UserId,
    VersionedDocument,
};

/// Client save request.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveStateRequest {
    /// Normalized next document.
    pub document: BoardDocument,
    /// Version the client last read.
    pub expected_version: StateVersion,
    /// Idempotency token.
    pub client_request_id: ClientRequestId,
    /// Authenticated author, when known.
    pub user_id: Option<UserId>,
}

/// Result of an accepted or replayed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStateResponse {
    /// Version now associated with the write.
    pub version: StateVersion,
    /// Whether the token had already been applied.
    pub replayed: bool,
}

/// Request to roll one project back to a historical entity event.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreEntityRequest {
    /// Project being restored.
    pub project_id: EntityId,
    /// Entity event whose `snapshot_after` should be applied.
    pub event_id: EntityEventId,
    /// Authenticated author, when known.
    pub user_id: Option<UserId>,
}

/// Write use-cases for the board document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardStateCommand: Send + Sync {
    /// Compare-and-write a client document.
    ///
    /// Fails with a `conflict` error carrying `currentVersion` when the
    /// expected version is stale.
    async fn save(&self, request: SaveStateRequest) -> Result<SaveStateResponse, Error>;

    /// Apply a historical project snapshot as a new versioned write.
    async fn restore_entity(
        &self,
        request: RestoreEntityRequest,
    ) -> Result<VersionedDocument, Error>;
}
