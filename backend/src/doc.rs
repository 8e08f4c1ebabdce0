//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every board, ledger, backup and health endpoint
//! together with the inbound schema wrappers. Domain types stay free of
//! utoipa derives; see [`crate::inbound::http::schemas`].
//!
//! The document backs Swagger UI in debug builds and is exported by the
//! `openapi-dump` binary.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::backups::{
    BackupDetail, BackupSummary, CreateBackupBody, RestoreBackupBody,
};
use crate::inbound::http::board_state::{SaveStateBody, SaveStateReply};
use crate::inbound::http::error::ConflictBody;
use crate::inbound::http::ledger::{
    EntityEventResponse, LedgerEntryResponse, RestoreEntityBody, RestoreReply,
};
use crate::inbound::http::schemas::{BoardDocumentSchema, ErrorCodeSchema, ErrorSchema};

/// Describe the optional session cookie used to attribute writes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Optional session cookie; when present, writes are attributed to its user.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Board sync API",
        description = "Versioned board document with an event ledger, entity history and backups."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::board_state::get_state,
        crate::inbound::http::board_state::save_state,
        crate::inbound::http::ledger::list_events,
        crate::inbound::http::ledger::entity_history,
        crate::inbound::http::ledger::restore_entity,
        crate::inbound::http::backups::list_backups,
        crate::inbound::http::backups::create_backup,
        crate::inbound::http::backups::get_backup,
        crate::inbound::http::backups::restore_backup,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        BoardDocumentSchema,
        ErrorSchema,
        ErrorCodeSchema,
        ConflictBody,
        SaveStateBody,
        SaveStateReply,
        LedgerEntryResponse,
        EntityEventResponse,
        RestoreEntityBody,
        RestoreReply,
        BackupSummary,
        BackupDetail,
        CreateBackupBody,
        RestoreBackupBody,
    )),
    tags(
        (name = "state", description = "Read and write the versioned board document"),
        (name = "ledger", description = "Write ledger and per-entity history"),
        (name = "backups", description = "Point-in-time snapshots and restores"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
