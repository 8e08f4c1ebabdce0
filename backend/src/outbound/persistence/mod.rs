//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the board document,
//! ledger and backup ports backed by PostgreSQL via the Diesel ORM with
//! async support through `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: Repository implementations only translate between
//!   Diesel models and domain types. Version checks and idempotency run
//!   inside the document store's transaction; everything else is domain.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are internal implementation details, never
//!   exposed to the domain layer.
//! - **Strongly typed errors**: All database errors are mapped to domain
//!   port error types.
//!
//! # Example
//!
//! ```ignore
//! use boardsync::outbound::persistence::{DbPool, DieselBoardStateRepository, PoolConfig};
//!
//! let config = PoolConfig::new("postgres://localhost/boardsync");
//! let pool = DbPool::new(config).await?;
//! let repo = DieselBoardStateRepository::new(pool);
//! ```

mod diesel_backup_repository;
mod diesel_board_state_repository;
mod diesel_error_mapping;
mod diesel_event_ledger;
mod ledger_rows;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_backup_repository::DieselBackupRepository;
pub use diesel_board_state_repository::{BOARD_STATE_KEY, DieselBoardStateRepository};
pub use diesel_event_ledger::DieselEventLedger;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
