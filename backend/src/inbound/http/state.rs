//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{BackupCommand, BackupQuery, BoardStateCommand, BoardStateQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub state_command: Arc<dyn BoardStateCommand>,
    pub state_query: Arc<dyn BoardStateQuery>,
    pub backup_command: Arc<dyn BackupCommand>,
    pub backup_query: Arc<dyn BackupQuery>,
}

impl HttpState {
    /// Bundle the board and backup ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use boardsync::domain::{BackupService, BoardStateService};
    /// use boardsync::inbound::http::state::HttpState;
    /// use boardsync::outbound::memory::InMemoryBoardStore;
    ///
    /// let store = Arc::new(InMemoryBoardStore::default());
    /// let board = Arc::new(BoardStateService::uncached(store.clone(), store.clone()));
    /// let backups = Arc::new(BackupService::uncached(store.clone(), store));
    /// let state = HttpState::new(board.clone(), board, backups.clone(), backups);
    /// let _query = state.state_query.clone();
    /// ```
    pub fn new(
        state_command: Arc<dyn BoardStateCommand>,
        state_query: Arc<dyn BoardStateQuery>,
        backup_command: Arc<dyn BackupCommand>,
        backup_query: Arc<dyn BackupQuery>,
    ) -> Self {
        Self {
            state_command,
            state_query,
            backup_command,
            backup_query,
        }
    }
}
