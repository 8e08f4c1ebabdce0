//! Ledger and per-entity history HTTP handlers.
//!
//! ```text
//! GET  /api/v1/events                  Ledger entries, oldest first
//! GET  /api/v1/entities/{id}/history   Entity events, newest first
//! POST /api/v1/entities/{id}/restore   Reapply a historical project snapshot
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::ports::RestoreEntityRequest;
use crate::domain::{EntityEvent, EntityEventId, LedgerEntry};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::NO_STORE;
use crate::inbound::http::schemas::{BoardDocumentSchema, ErrorSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_entity_id, parse_row_id, require};

const ENTITY_ID_FIELD: FieldName = FieldName::new("id");
const EVENT_ID_FIELD: FieldName = FieldName::new("eventId");

/// One accepted write as recorded in the ledger.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    /// Ledger row identifier.
    pub id: i64,
    /// Idempotency token the write was accepted under.
    pub client_request_id: String,
    /// Document version this write produced.
    pub version: u64,
    /// Document content written at this version.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Hex-encoded SHA-256 of the canonical document.
    pub payload_hash: String,
    /// `client`, `entity_restore` or `backup_restore`.
    pub origin: String,
    /// Session user who made the write, when known.
    pub user_id: Option<String>,
    /// RFC 3339 time the entry was recorded.
    pub created_at: String,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.get(),
            client_request_id: entry.client_request_id.to_string(),
            version: entry.version.get(),
            data: entry.data.to_value(),
            payload_hash: entry.payload_hash.to_string(),
            origin: entry.origin,
            user_id: entry.user_id.map(|id| id.to_string()),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// One project-level change.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityEventResponse {
    /// Entity event identifier, usable as `eventId` in a restore.
    pub id: i64,
    /// Ledger entry whose write produced this change.
    pub ledger_entry_id: i64,
    /// Project the change applies to.
    pub project_id: String,
    /// Session user who made the write, when known.
    pub user_id: Option<String>,
    /// `create`, `update`, `delete` or `restore`.
    pub action_type: String,
    /// Action-specific detail, such as the changed field names.
    #[schema(value_type = Object)]
    pub payload: Value,
    /// Project content after the change; `null` for deletions.
    #[schema(value_type = Option<Object>)]
    pub snapshot_after: Option<Value>,
    /// RFC 3339 time the change was recorded.
    pub created_at: String,
}

impl From<EntityEvent> for EntityEventResponse {
    fn from(event: EntityEvent) -> Self {
        Self {
            id: event.id.get(),
            ledger_entry_id: event.ledger_entry_id.get(),
            project_id: event.project_id.to_string(),
            user_id: event.user_id.map(|id| id.to_string()),
            action_type: event.action_type.as_str().to_owned(),
            payload: event.payload,
            snapshot_after: event.snapshot_after,
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for an entity restore.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreEntityBody {
    /// Entity event whose snapshot should be reapplied.
    #[schema(value_type = i64)]
    pub event_id: Option<Value>,
}

/// Envelope returned by restore endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestoreReply {
    /// Always `true`.
    pub success: bool,
    /// Document after the restore, with `version` merged in.
    #[schema(value_type = BoardDocumentSchema)]
    pub data: Value,
}

/// List every ledger entry, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "Ledger entries", body = [LedgerEntryResponse]),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "listEvents"
)]
#[get("/events")]
pub async fn list_events(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let entries = state.state_query.list_entries().await?;
    let body: Vec<LedgerEntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", NO_STORE))
        .json(body))
}

/// List the change history of one project, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/entities/{id}/history",
    params(("id" = String, Path, description = "Project identifier")),
    responses(
        (status = 200, description = "Entity events", body = [EntityEventResponse]),
        (status = 400, description = "Invalid project id", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "entityHistory"
)]
#[get("/entities/{id}/history")]
pub async fn entity_history(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<EntityEventResponse>>> {
    let project_id = parse_entity_id(&path.into_inner(), ENTITY_ID_FIELD)?;
    let history = state.state_query.entity_history(&project_id).await?;
    Ok(web::Json(history.into_iter().map(Into::into).collect()))
}

/// Reapply the project snapshot recorded by an entity event.
#[utoipa::path(
    post,
    path = "/api/v1/entities/{id}/restore",
    params(("id" = String, Path, description = "Project identifier")),
    request_body = RestoreEntityBody,
    responses(
        (status = 200, description = "Project restored", body = RestoreReply),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown event for this project", body = ErrorSchema),
        (status = 409, description = "Concurrent writes kept moving the version; retry the restore", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "restoreEntity"
)]
#[post("/entities/{id}/restore")]
pub async fn restore_entity(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RestoreEntityBody>,
) -> ApiResult<web::Json<RestoreReply>> {
    let project_id = parse_entity_id(&path.into_inner(), ENTITY_ID_FIELD)?;
    let event_id = require(payload.into_inner().event_id, EVENT_ID_FIELD)?;
    let event_id = EntityEventId::new(parse_row_id(&event_id, EVENT_ID_FIELD)?);
    let user_id = session.author()?;

    let restored = state
        .state_command
        .restore_entity(RestoreEntityRequest {
            project_id,
            event_id,
            user_id,
        })
        .await?;

    Ok(web::Json(RestoreReply {
        success: true,
        data: restored.to_value(),
    }))
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
