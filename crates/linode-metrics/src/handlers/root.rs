use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::router::ExporterState;

pub async fn index(State(state): State<Arc<ExporterState>>) -> Html<String> {
    Html(format!(
        "<h2>Linode Exporter</h2><a href=\"{path}\">metrics</a>",
        path = state.metrics_path
    ))
}
