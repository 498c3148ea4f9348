use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::outbreak::OutbreakPipeline;
use crate::store::EngineStore;

pub async fn list_active_alerts(
    Extension(store): Extension<Arc<dyn EngineStore>>,
) -> Response {
    match store.all_active_alerts().await {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => super::store_error(e),
    }
}

/// Explicit end-of-outbreak operation; the engine never deactivates an alert
/// on its own.
pub async fn deactivate_alert(
    Extension(pipeline): Extension<Arc<OutbreakPipeline>>,
    Path(alert_id): Path<Uuid>,
) -> Response {
    match pipeline.detector.deactivate_alert(alert_id).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => super::store_error(e),
    }
}

pub async fn mark_receipt_read(
    Extension(store): Extension<Arc<dyn EngineStore>>,
    Path(receipt_id): Path<Uuid>,
) -> Response {
    match store.mark_receipt_read(receipt_id).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => super::store_error(e),
    }
}
