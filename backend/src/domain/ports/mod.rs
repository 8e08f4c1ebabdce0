//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod backup_command;
mod backup_repository;
mod board_state_command;
mod board_state_query;
mod board_state_repository;
mod event_ledger;
mod state_cache;
mod state_write_metrics;

pub use backup_command::{BackupCommand, BackupQuery};
#[cfg(test)]
pub use backup_command::{MockBackupCommand, MockBackupQuery};
#[cfg(test)]
pub use backup_repository::MockBackupRepository;
pub use backup_repository::{BackupRepository, BackupRepositoryError};
#[cfg(test)]
pub use board_state_command::MockBoardStateCommand;
pub use board_state_command::{
    BoardStateCommand, RestoreEntityRequest, SaveStateRequest, SaveStateResponse,
};
#[cfg(test)]
pub use board_state_query::MockBoardStateQuery;
pub use board_state_query::BoardStateQuery;
#[cfg(test)]
pub use board_state_repository::MockBoardStateRepository;
pub use board_state_repository::{
    BoardStateRepository, BoardStateRepositoryError, CommitOutcome, VersionedWrite,
};
#[cfg(test)]
pub use event_ledger::MockEventLedger;
pub use event_ledger::{EventLedger, EventLedgerError};
#[cfg(test)]
pub use state_cache::MockStateCache;
pub use state_cache::{NoOpStateCache, StateCache, StateCacheError};
#[cfg(test)]
pub use state_write_metrics::MockStateWriteMetrics;
pub use state_write_metrics::{
    NoOpStateWriteMetrics, StateWriteMetrics, StateWriteMetricsError, WriteOutcome,
};
