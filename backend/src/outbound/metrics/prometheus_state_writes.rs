//! Prometheus adapter for board write outcomes.
//!
//! # Metric
//!
//! - **Name**: `board_state_writes_total`
//! - **Type**: Counter
//! - **Labels**: `outcome` is `accepted`, `replayed` or `conflict`

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ports::{StateWriteMetrics, StateWriteMetricsError, WriteOutcome};

/// Prometheus-backed write outcome recorder.
pub struct PrometheusStateWriteMetrics {
    writes_total: IntCounterVec,
}

impl PrometheusStateWriteMetrics {
    /// Create and register the counter with `registry`.
    ///
    /// # Errors
    ///
    /// Fails when a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let writes_total = IntCounterVec::new(
            Opts::new(
                "board_state_writes_total",
                "Board document write attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(writes_total.clone()))?;
        Ok(Self { writes_total })
    }
}

#[async_trait]
impl StateWriteMetrics for PrometheusStateWriteMetrics {
    async fn record(&self, outcome: WriteOutcome) -> Result<(), StateWriteMetricsError> {
        self.writes_total
            .with_label_values(&[outcome.as_label()])
            .inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn outcomes_increment_their_own_series() {
        let registry = Registry::new();
        let metrics =
            PrometheusStateWriteMetrics::new(&registry).expect("metric registration should succeed");

        metrics.record(WriteOutcome::Accepted).await.expect("record");
        metrics.record(WriteOutcome::Accepted).await.expect("record");
        metrics.record(WriteOutcome::Conflict).await.expect("record");

        let accepted = metrics.writes_total.with_label_values(&["accepted"]).get();
        let conflict = metrics.writes_total.with_label_values(&["conflict"]).get();
        let replayed = metrics.writes_total.with_label_values(&["replayed"]).get();
        assert_eq!((accepted, conflict, replayed), (2, 1, 0));
    }

    #[rstest]
    fn registering_twice_fails() {
        let registry = Registry::new();
        PrometheusStateWriteMetrics::new(&registry).expect("first registration");

        assert!(PrometheusStateWriteMetrics::new(&registry).is_err());
    }
}
