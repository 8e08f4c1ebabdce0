//! Domain port surface for recording state write outcomes.
//!
//! Keeps the write path observable without coupling it to a metrics
//! backend. Recording failures are logged by callers and never fail a write.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording write metrics.
    pub enum StateWriteMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => internal: "state write metrics exporter failed: {message}",
    }
}

/// How a write attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// The write was applied.
    Accepted,
    /// The token had already been applied.
    Replayed,
    /// The expected version was stale.
    Conflict,
}

impl WriteOutcome {
    /// Metric label value.
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Replayed => "replayed",
            Self::Conflict => "conflict",
        }
    }
}

/// Metrics recording port for write outcomes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateWriteMetrics: Send + Sync {
    /// Record the outcome of one write attempt.
    async fn record(&self, outcome: WriteOutcome) -> Result<(), StateWriteMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStateWriteMetrics;

#[async_trait]
impl StateWriteMetrics for NoOpStateWriteMetrics {
    async fn record(&self, _outcome: WriteOutcome) -> Result<(), StateWriteMetricsError> {
        Ok(())
    }
}
