//! Optional Prometheus metrics middleware and registry bootstrap.

use actix_service::{
    Service, ServiceExt as _, Transform,
    boxed::{self, BoxService},
};
use actix_web::body::BoxBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use futures_util::future::LocalBoxFuture;
use std::sync::Arc;
use tracing::warn;

use boardsync::domain::ports::{NoOpStateWriteMetrics, StateWriteMetrics};
use boardsync::outbound::metrics::PrometheusStateWriteMetrics;

const METRICS_NAMESPACE: &str = "boardsync";

/// Request metrics plus the write-outcome recorder sharing its registry.
pub(crate) struct Metrics {
    pub(crate) prometheus: Option<PrometheusMetrics>,
    pub(crate) state_writes: Arc<dyn StateWriteMetrics>,
}

/// Build the `/metrics` endpoint middleware and register the write counter.
///
/// Registration failures disable metrics rather than aborting startup.
pub(crate) fn build_metrics() -> Metrics {
    let prometheus = match PrometheusMetricsBuilder::new(METRICS_NAMESPACE)
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(error) => {
            warn!(%error, "failed to configure Prometheus metrics; continuing without them");
            return Metrics {
                prometheus: None,
                state_writes: Arc::new(NoOpStateWriteMetrics),
            };
        }
    };

    let state_writes: Arc<dyn StateWriteMetrics> =
        match PrometheusStateWriteMetrics::new(&prometheus.registry) {
            Ok(metrics) => Arc::new(metrics),
            Err(error) => {
                warn!(%error, "failed to register state write metrics");
                Arc::new(NoOpStateWriteMetrics)
            }
        };

    Metrics {
        prometheus: Some(prometheus),
        state_writes,
    }
}

#[derive(Clone)]
pub(crate) enum MetricsLayer {
    Enabled(Arc<PrometheusMetrics>),
    Disabled,
}

impl MetricsLayer {
    #[must_use]
    pub(crate) fn from_option(metrics: Option<PrometheusMetrics>) -> Self {
        match metrics {
            Some(metrics) => Self::Enabled(Arc::new(metrics)),
            None => Self::Disabled,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;
    type Future = LocalBoxFuture<'static, Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        match self.clone() {
            MetricsLayer::Enabled(metrics) => {
                let fut = Compat::new((*metrics).clone()).new_transform(service);
                Box::pin(async move {
                    let svc = fut.await?;
                    Ok(boxed::service(svc))
                })
            }
            MetricsLayer::Disabled => Box::pin(async move {
                let svc = service.map(|res: ServiceResponse<B>| res.map_into_boxed_body());
                Ok(boxed::service(svc))
            }),
        }
    }
}
