use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::care::{CareService, EndReason};

#[derive(serde::Deserialize)]
pub struct BeginCareRequest {
    pub caretaker_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

pub async fn begin_temporary_care(
    Extension(care): Extension<Arc<CareService>>,
    Path(pet_id): Path<Uuid>,
    Json(payload): Json<BeginCareRequest>,
) -> Response {
    let now = Utc::now().naive_utc();
    match care
        .begin_temporary_care(
            pet_id,
            payload.caretaker_id,
            payload.start_date,
            payload.end_date,
            now,
        )
        .await
    {
        Ok(pet) => (StatusCode::CREATED, Json(pet)).into_response(),
        Err(e) => super::engine_error(e),
    }
}

#[derive(serde::Deserialize)]
pub struct ExtensionRequestBody {
    pub new_end_date: NaiveDateTime,
}

pub async fn request_extension(
    Extension(care): Extension<Arc<CareService>>,
    Path(pet_id): Path<Uuid>,
    Json(payload): Json<ExtensionRequestBody>,
) -> Response {
    let now = Utc::now().naive_utc();
    match care
        .request_extension(pet_id, payload.new_end_date, now)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => super::engine_error(e),
    }
}

#[derive(serde::Deserialize)]
pub struct ExtensionResponseBody {
    pub approve: bool,
}

pub async fn respond_to_extension(
    Extension(care): Extension<Arc<CareService>>,
    Path((pet_id, request_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ExtensionResponseBody>,
) -> Response {
    let now = Utc::now().naive_utc();
    match care
        .respond_to_extension(pet_id, request_id, payload.approve, now)
        .await
    {
        Ok(pet) => (StatusCode::OK, Json(pet)).into_response(),
        Err(e) => super::engine_error(e),
    }
}

#[derive(serde::Deserialize, Default)]
pub struct EndCareRequest {
    #[serde(default)]
    pub relist: bool,
}

pub async fn end_temporary_care(
    Extension(care): Extension<Arc<CareService>>,
    Path(pet_id): Path<Uuid>,
    Json(payload): Json<EndCareRequest>,
) -> Response {
    let now = Utc::now().naive_utc();
    match care
        .end_assignment(
            pet_id,
            EndReason::OwnerEnded {
                relist: payload.relist,
            },
            now,
        )
        .await
    {
        Ok(ended) => (StatusCode::OK, Json(ended.pet)).into_response(),
        Err(e) => super::engine_error(e),
    }
}
