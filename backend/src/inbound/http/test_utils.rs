//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, Route, web};

use crate::domain::ports::{
    BackupCommand, BackupQuery, BoardStateCommand, BoardStateQuery, MockBackupCommand,
    MockBackupQuery, MockBoardStateCommand, MockBoardStateQuery,
};

use super::session::USER_ID_KEY;
use super::state::HttpState;

/// Build a session middleware configured for tests.
///
/// Generates a fresh key per invocation, names the cookie `session` and
/// disables the `Secure` flag for local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Bare app wrapped in the test session middleware.
pub fn session_test_app() -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().wrap(test_session_middleware())
}

/// Route that stores `user_id` in the session when one is given.
pub fn set_session_user_route(user_id: Option<&'static str>) -> Route {
    web::get().to(move |session: Session| async move {
        if let Some(id) = user_id {
            session
                .insert(USER_ID_KEY, id)
                .expect("session insert succeeds");
        }
        HttpResponse::Ok().finish()
    })
}

/// Mock ports, configured per test and frozen into [`HttpState`].
#[derive(Default)]
pub struct MockPorts {
    pub state_command: MockBoardStateCommand,
    pub state_query: MockBoardStateQuery,
    pub backup_command: MockBackupCommand,
    pub backup_query: MockBackupQuery,
}

impl MockPorts {
    /// Freeze the configured mocks into handler state.
    pub fn into_state(self) -> web::Data<HttpState> {
        let state_command: Arc<dyn BoardStateCommand> = Arc::new(self.state_command);
        let state_query: Arc<dyn BoardStateQuery> = Arc::new(self.state_query);
        let backup_command: Arc<dyn BackupCommand> = Arc::new(self.backup_command);
        let backup_query: Arc<dyn BackupQuery> = Arc::new(self.backup_query);
        web::Data::new(HttpState::new(
            state_command,
            state_query,
            backup_command,
            backup_query,
        ))
    }
}

/// App serving `routes` under `/api/v1` with the production JSON config and
/// a test session.
pub fn api_test_app(
    state: web::Data<HttpState>,
    routes: fn(&mut web::ServiceConfig),
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(super::json_config())
        .wrap(test_session_middleware())
        .service(web::scope("/api/v1").configure(routes))
}
