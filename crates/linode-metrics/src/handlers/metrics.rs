use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{collector::ScrapeContext, registry::render_prometheus, router::ExporterState};

pub async fn prometheus_metrics(State(state): State<Arc<ExporterState>>) -> impl IntoResponse {
    let ctx = ScrapeContext::with_timeout(state.scrape_timeout);
    let families = state.registry.gather(&ctx).await;
    debug!(families = families.len(), "scrape gathered");
    let payload = render_prometheus(&families);

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );

    response
}
