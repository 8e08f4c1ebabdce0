//! HTTP inbound adapter exposing the board REST endpoints.
//!
//! Handlers are mounted under `/api/v1` by [`configure_api`]; the health
//! probes sit outside that scope.

pub mod backups;
pub mod board_state;
pub mod cache_control;
pub mod error;
pub mod health;
pub mod ledger;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// JSON extractor configuration shared by every API route.
///
/// Malformed bodies surface as `invalid_request` errors in the standard
/// error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(error::json_error_handler)
}

/// Register every `/api/v1` handler on `cfg`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(board_state::get_state)
        .service(board_state::save_state)
        .service(ledger::list_events)
        .service(ledger::entity_history)
        .service(ledger::restore_entity)
        .service(backups::list_backups)
        .service(backups::create_backup)
        .service(backups::restore_backup)
        .service(backups::get_backup);
}
