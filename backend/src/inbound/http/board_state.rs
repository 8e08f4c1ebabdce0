//! Board document HTTP handlers.
//!
//! ```text
//! GET  /api/v1/state  Read the current document and its version
//! POST /api/v1/state  Compare-and-write the document
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{BoardDocument, ClientRequestId, StateVersion};
use crate::domain::ports::SaveStateRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::NO_STORE;
use crate::inbound::http::error::ConflictBody;
use crate::inbound::http::schemas::{BoardDocumentSchema, ErrorSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_client_request_id, parse_document, parse_version, require,
};

const DATA_FIELD: FieldName = FieldName::new("data");
const VERSION_FIELD: FieldName = FieldName::new("version");
const TOKEN_FIELD: FieldName = FieldName::new("client_request_id");

/// Request payload for a versioned write.
///
/// Fields are optional at the serde layer so missing ones surface as
/// field-specific validation errors instead of a generic parse failure.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct SaveStateBody {
    /// Next document: an object with a `projects` array, or a bare array.
    #[schema(value_type = Object)]
    pub data: Option<Value>,
    /// Version the client last read.
    #[schema(value_type = u64)]
    pub version: Option<Value>,
    /// Idempotency token for this logical write.
    #[serde(alias = "clientRequestId")]
    pub client_request_id: Option<String>,
}

/// Response for an accepted or replayed write.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveStateReply {
    /// Always `true`.
    pub ok: bool,
    /// Version now associated with the write.
    pub version: u64,
}

fn parse_save_request(body: SaveStateBody) -> ApiResult<ParsedSave> {
    let data = require(body.data, DATA_FIELD)?;
    let version = require(body.version, VERSION_FIELD)?;
    let token = require(body.client_request_id, TOKEN_FIELD)?;

    Ok(ParsedSave {
        document: parse_document(data, DATA_FIELD)?,
        expected_version: StateVersion::new(parse_version(&version, VERSION_FIELD)?),
        client_request_id: parse_client_request_id(&token, TOKEN_FIELD)?,
    })
}

struct ParsedSave {
    document: BoardDocument,
    expected_version: StateVersion,
    client_request_id: ClientRequestId,
}

/// Read the current board document.
#[utoipa::path(
    get,
    path = "/api/v1/state",
    description = "Current document with `version` merged in, or `null` before the first write.",
    responses(
        (status = 200, description = "Current document", body = BoardDocumentSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["state"],
    operation_id = "getState"
)]
#[get("/state")]
pub async fn get_state(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let current = state.state_query.fetch().await?;
    let body = current.map_or(Value::Null, |document| document.to_value());
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", NO_STORE))
        .json(body))
}

/// Compare-and-write the board document.
#[utoipa::path(
    post,
    path = "/api/v1/state",
    request_body = SaveStateBody,
    responses(
        (status = 200, description = "Write accepted or replayed", body = SaveStateReply),
        (status = 400, description = "Malformed body", body = ErrorSchema),
        (status = 409, description = "Stale version", body = ConflictBody),
        (status = 500, description = "Storage failure", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["state"],
    operation_id = "saveState"
)]
#[post("/state")]
pub async fn save_state(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SaveStateBody>,
) -> ApiResult<web::Json<SaveStateReply>> {
    let parsed = parse_save_request(payload.into_inner())?;
    let user_id = session.author()?;

    let response = state
        .state_command
        .save(SaveStateRequest {
            document: parsed.document,
            expected_version: parsed.expected_version,
            client_request_id: parsed.client_request_id,
            user_id,
        })
        .await?;

    Ok(web::Json(SaveStateReply {
        ok: true,
        version: response.version.get(),
    }))
}

#[cfg(test)]
#[path = "board_state_tests.rs"]
mod tests;
