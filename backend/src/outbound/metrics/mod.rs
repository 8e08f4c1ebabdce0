//! Outbound adapters for metrics exporting.
//!
//! Prometheus-backed implementations of domain metrics ports, compiled only
//! with the `metrics` feature.

mod prometheus_state_writes;

pub use prometheus_state_writes::PrometheusStateWriteMetrics;
