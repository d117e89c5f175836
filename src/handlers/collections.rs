use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::metrics::collections::Collection;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionList {
    pub collection_uris: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedCollection {
    pub uri: String,
}

// ─── GET /metrics/collections ────────────────────────────────────

pub async fn list_collections(State(state): State<Arc<AppState>>) -> Json<CollectionList> {
    Json(CollectionList {
        collection_uris: state.metrics.collection_uris(),
    })
}

// ─── POST /metrics/collections ───────────────────────────────────

pub async fn create_collection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uri = state.metrics.create_collection();
    info!(%uri, "collection created");
    (
        StatusCode::CREATED,
        [(header::LOCATION, uri.clone())],
        Json(CreatedCollection { uri }),
    )
}

// ─── GET /metrics/collections/:id ────────────────────────────────

pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Collection>, AppError> {
    let id = parse_id(&id)?;
    state
        .metrics
        .collection(id)
        .map(Json)
        .ok_or_else(|| missing(id))
}

// ─── PUT /metrics/collections/:id ────────────────────────────────
/// Zeroes the collection and restarts its window.

pub async fn reset_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.metrics.reset_collection(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(missing(id))
    }
}

// ─── DELETE /metrics/collections/:id ─────────────────────────────

pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.metrics.delete_collection(id) {
        info!(id, "collection deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(missing(id))
    }
}

/// Ids that cannot exist are reported the same way as deleted ones.
fn parse_id(raw: &str) -> Result<u64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("no collection '{raw}'")))
}

fn missing(id: u64) -> AppError {
    AppError::NotFound(format!("no collection {id}"))
}
