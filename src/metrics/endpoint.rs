use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

use crate::AppState;

/// Content type for the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// ─── GET /metrics ────────────────────────────────────────────────
/// Scrape endpoint. Each call closes the current snapshot epoch.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}
