use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use linode_common::{LinodeError, Result};
use tower_http::trace::TraceLayer;

use crate::{collector::MAX_SCRAPE_TIMEOUT, handlers, registry::CollectorRegistry};

const HEALTH_PATH: &str = "/health/live";

pub struct ExporterState {
    pub registry: Arc<CollectorRegistry>,
    pub scrape_timeout: Duration,
    pub metrics_path: String,
}

impl ExporterState {
    pub fn new(
        registry: Arc<CollectorRegistry>,
        scrape_timeout: Duration,
        metrics_path: impl Into<String>,
    ) -> Result<Self> {
        let metrics_path = metrics_path.into();
        if !metrics_path.starts_with('/') || metrics_path == "/" || metrics_path == HEALTH_PATH {
            return Err(LinodeError::InvalidArgument(format!(
                "metrics path must start with '/' and not collide with other routes: {metrics_path}"
            )));
        }
        if scrape_timeout.is_zero() || scrape_timeout > MAX_SCRAPE_TIMEOUT {
            return Err(LinodeError::InvalidArgument(format!(
                "scrape timeout must be greater than zero and at most {}s, got {}s",
                MAX_SCRAPE_TIMEOUT.as_secs(),
                scrape_timeout.as_secs()
            )));
        }

        Ok(Self {
            registry,
            scrape_timeout,
            metrics_path,
        })
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/", get(handlers::root::index))
        .route(HEALTH_PATH, get(handlers::health::health_live))
        .route(
            &state.metrics_path,
            get(handlers::metrics::prometheus_metrics),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
