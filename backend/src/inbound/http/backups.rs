//! Backup HTTP handlers.
//!
//! ```text
//! GET  /api/v1/backups          Backups, newest first
//! POST /api/v1/backups          Capture an on-demand backup
//! GET  /api/v1/backups/{id}     One backup including its snapshot
//! POST /api/v1/backups/restore  Write a backup back as the next version
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{Backup, BackupId, BackupKind};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::NO_STORE;
use crate::inbound::http::ledger::RestoreReply;
use crate::inbound::http::schemas::{BoardDocumentSchema, ErrorSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_row_id, require};

const BACKUP_ID_FIELD: FieldName = FieldName::new("backupId");
const PATH_ID_FIELD: FieldName = FieldName::new("id");
const MAX_SOURCE_LEN: usize = 100;

/// Source recorded for on-demand backups that do not name one.
pub const API_BACKUP_SOURCE: &str = "api";

/// Backup metadata as listed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub id: i64,
    /// `startup`, `hourly`, `daily` or `manual`.
    pub kind: String,
    pub source: String,
    /// Document version captured, when the snapshot records one.
    pub version: Option<u64>,
    pub created_at: String,
}

impl From<&Backup> for BackupSummary {
    fn from(backup: &Backup) -> Self {
        Self {
            id: backup.id.get(),
            kind: backup.kind.as_str().to_owned(),
            source: backup.source.clone(),
            version: backup.captured_version(),
            created_at: backup.created_at.to_rfc3339(),
        }
    }
}

/// Backup metadata plus the captured snapshot.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupDetail {
    #[serde(flatten)]
    pub summary: BackupSummary,
    #[schema(value_type = BoardDocumentSchema)]
    pub snapshot: Value,
}

impl From<Backup> for BackupDetail {
    fn from(backup: Backup) -> Self {
        Self {
            summary: BackupSummary::from(&backup),
            snapshot: backup.snapshot,
        }
    }
}

/// Request payload for an on-demand backup.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateBackupBody {
    /// Free-form label for who or what requested the backup.
    pub source: Option<String>,
}

/// Request payload for a backup restore.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreBackupBody {
    #[schema(value_type = i64)]
    pub backup_id: Option<Value>,
}

fn backup_source(body: Option<CreateBackupBody>) -> String {
    body.and_then(|body| body.source)
        .map(|source| source.trim().chars().take(MAX_SOURCE_LEN).collect::<String>())
        .filter(|source| !source.is_empty())
        .unwrap_or_else(|| API_BACKUP_SOURCE.to_owned())
}

/// List backups, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/backups",
    responses(
        (status = 200, description = "Backups", body = [BackupSummary]),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["backups"],
    operation_id = "listBackups"
)]
#[get("/backups")]
pub async fn list_backups(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let backups = state.backup_query.list_backups().await?;
    let body: Vec<BackupSummary> = backups.iter().map(BackupSummary::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", NO_STORE))
        .json(body))
}

/// Capture the current document as a manual backup.
#[utoipa::path(
    post,
    path = "/api/v1/backups",
    request_body(content = CreateBackupBody, description = "Optional source label"),
    responses(
        (status = 201, description = "Backup created", body = BackupDetail),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["backups"],
    operation_id = "createBackup"
)]
#[post("/backups")]
pub async fn create_backup(
    state: web::Data<HttpState>,
    payload: Option<web::Json<CreateBackupBody>>,
) -> ApiResult<HttpResponse> {
    let source = backup_source(payload.map(web::Json::into_inner));
    let backup = state
        .backup_command
        .create_snapshot(BackupKind::Manual, &source)
        .await?;
    Ok(HttpResponse::Created().json(BackupDetail::from(backup)))
}

/// Fetch one backup including its snapshot.
#[utoipa::path(
    get,
    path = "/api/v1/backups/{id}",
    params(("id" = i64, Path, description = "Backup identifier")),
    responses(
        (status = 200, description = "Backup", body = BackupDetail),
        (status = 400, description = "Invalid backup id", body = ErrorSchema),
        (status = 404, description = "Unknown backup", body = ErrorSchema)
    ),
    tags = ["backups"],
    operation_id = "getBackup"
)]
#[get("/backups/{id}")]
pub async fn get_backup(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<BackupDetail>> {
    let id = parse_row_id(&Value::String(path.into_inner()), PATH_ID_FIELD)?;
    let backup = state.backup_query.get_backup(BackupId::new(id)).await?;
    Ok(web::Json(BackupDetail::from(backup)))
}

/// Write a backup's content as the next document version.
#[utoipa::path(
    post,
    path = "/api/v1/backups/restore",
    request_body = RestoreBackupBody,
    responses(
        (status = 200, description = "Backup restored", body = RestoreReply),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown backup", body = ErrorSchema),
        (status = 409, description = "Concurrent writes kept moving the version; retry the restore", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["backups"],
    operation_id = "restoreBackup"
)]
#[post("/backups/restore")]
pub async fn restore_backup(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RestoreBackupBody>,
) -> ApiResult<web::Json<RestoreReply>> {
    let backup_id = require(payload.into_inner().backup_id, BACKUP_ID_FIELD)?;
    let backup_id = BackupId::new(parse_row_id(&backup_id, BACKUP_ID_FIELD)?);
    let user_id = session.author()?;

    let restored = state
        .backup_command
        .restore_backup(backup_id, user_id)
        .await?;

    Ok(web::Json(RestoreReply {
        success: true,
        data: restored.to_value(),
    }))
}

#[cfg(test)]
#[path = "backups_tests.rs"]
mod tests;
