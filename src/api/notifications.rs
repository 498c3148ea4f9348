use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::notify::NotificationSink;
use crate::scheduler::ExpirationScheduler;

pub async fn list_user_notifications(
    Extension(sink): Extension<Arc<NotificationSink>>,
    Path(user_id): Path<Uuid>,
) -> Response {
    match sink.user_notifications(user_id).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => super::store_error(e),
    }
}

pub async fn mark_notification_read(
    Extension(sink): Extension<Arc<NotificationSink>>,
    Path(notification_id): Path<Uuid>,
) -> Response {
    match sink.mark_read(notification_id).await {
        Ok(n) => (StatusCode::OK, Json(n)).into_response(),
        Err(e) => super::store_error(e),
    }
}

/// Daily sweep entry point, also wired to an internal route so operators can
/// run a reconciliation on demand.
pub async fn run_sweep(
    Extension(scheduler): Extension<Arc<ExpirationScheduler>>,
) -> Response {
    let now = Utc::now().naive_utc();
    match scheduler.run_daily_sweep(now).await {
        Ok(fired) => (StatusCode::OK, Json(json!({"fired": fired}))).into_response(),
        Err(e) => super::store_error(e),
    }
}
