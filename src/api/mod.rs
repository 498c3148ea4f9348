pub mod alerts;
pub mod care;
pub mod detections;
pub mod notifications;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{EngineError, StoreError};

/// Map a primary-action failure to a structured error response.
pub(crate) fn engine_error(e: EngineError) -> Response {
    let status = match &e {
        EngineError::PetNotFound(_) | EngineError::UserNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidTransition(_) => StatusCode::CONFLICT,
        EngineError::VersionConflict(_) => StatusCode::CONFLICT,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", e);
        return (status, Json(json!({"error": "internal error"}))).into_response();
    }
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

pub(crate) fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::NotFound => {
            (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
        }
        other => {
            tracing::error!("Request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
                .into_response()
        }
    }
}
