use axum::Router;
use std::sync::Arc;
use tracing::{error, info};

use appmetrics_exporter::config;
use appmetrics_exporter::logging;
use appmetrics_exporter::metrics::MetricsRegistry;
use appmetrics_exporter::sampler::Sampler;
use appmetrics_exporter::server;
use appmetrics_exporter::AppState;

#[tokio::main]
async fn main() {
    // ── 1. Load configuration ────────────────────────────────────
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Invalid logging.level '{}': {e}", config.logging.level);
        std::process::exit(1);
    }

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        metrics: Arc::new(MetricsRegistry::new()),
        config: Arc::new(config),
    });

    // ── 3. Start the telemetry sampler ───────────────────────────
    let sampler = Sampler::new(state.metrics.clone(), &state.config).spawn();

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state.clone(), Router::new());

    // ── 5. Bind & serve ──────────────────────────────────────────
    let addr = state.config.bind_address.clone();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        %addr,
        metrics_path = %state.config.metrics_path,
        "exporter listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!(%e, "server exited with error");
    }
    sampler.abort();
}
