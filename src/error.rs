//! Error types shared by ingestion and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Raised when an event fails validation at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("{kind} event has negative duration {value}")]
    NegativeDuration { kind: &'static str, value: f64 },
    #[error("{kind} event has non-finite {field}")]
    NonFinite {
        kind: &'static str,
        field: &'static str,
    },
}

// ─── Unified handler error ───────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
