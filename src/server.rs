use axum::{
    http::StatusCode,
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::endpoint;
use crate::middleware::timing;
use crate::AppState;

/// Builds the exporter's own routes, mounted under `metrics_path`.
pub fn exporter_routes(metrics_path: &str) -> Router<Arc<AppState>> {
    let base = metrics_path.trim_end_matches('/');
    let scrape = if base.is_empty() { "/" } else { base };

    Router::new()
        // ── Scrape ──────────────────────────────────────────────
        .route(scrape, get(endpoint::get_metrics))
        // ── Profiling pass-through ──────────────────────────────
        .route(
            &format!("{base}/profiling"),
            get(handlers::profiling::get_profiling),
        )
        .route(
            &format!("{base}/profiling/:mode"),
            post(handlers::profiling::set_profiling),
        )
        // ── Client-owned collections ────────────────────────────
        .route(
            &format!("{base}/collections"),
            get(handlers::collections::list_collections)
                .post(handlers::collections::create_collection),
        )
        .route(
            &format!("{base}/collections/:id"),
            get(handlers::collections::get_collection)
                .put(handlers::collections::reset_collection)
                .delete(handlers::collections::delete_collection),
        )
        // ── Static environment info ─────────────────────────────
        .route(
            &format!("{base}/environment"),
            get(handlers::environment::get_environment),
        )
}

/// Builds the full Axum `Router`: the application's routes merged with the
/// exporter's, all wrapped by the timing middleware so served requests
/// become `http` events.
pub fn create_router(state: Arc<AppState>, app: Router<Arc<AppState>>) -> Router {
    app.merge(exporter_routes(&state.config.metrics_path))
        .route("/health", get(health_check))
        .fallback(not_found)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
