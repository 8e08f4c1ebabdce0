//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed document store, ledger and backups
//!   using Diesel ORM
//! - **memory**: in-process store used when no database is configured
//! - **cache**: in-process and Redis read-through document caches
//! - **metrics**: Prometheus-backed metrics exporters (feature-gated)
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
