use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::metrics::ProfilingSample;
use crate::AppState;

// ─── POST /metrics/profiling/:mode ───────────────────────────────

pub async fn set_profiling(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
) -> Result<&'static str, AppError> {
    let enabled = match mode.as_str() {
        "on" => true,
        "off" => false,
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown profiling mode '{other}', expected 'on' or 'off'"
            )))
        }
    };

    state.metrics.profiling().set_enabled(enabled);
    info!(enabled, "profiling toggled");

    Ok(if enabled {
        "Profiling enabled"
    } else {
        "Profiling disabled"
    })
}

// ─── GET /metrics/profiling ──────────────────────────────────────
/// Drains whatever the profiler has buffered since the last fetch.

pub async fn get_profiling(State(state): State<Arc<AppState>>) -> Json<Vec<ProfilingSample>> {
    Json(state.metrics.profiling().drain())
}
