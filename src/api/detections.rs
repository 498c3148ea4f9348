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

use crate::collab::{ClassifierClient, EnrichmentClient};
use crate::entities::detection_event;
use crate::error::CollabError;
use crate::outbreak::OutbreakPipeline;
use crate::store::EngineStore;

#[derive(serde::Deserialize)]
pub struct AnalyzeRequest {
    pub image_path: String,
    pub notes: Option<String>,
}

/// Analyze an uploaded photo for one pet: classify, enrich with care advice,
/// record the detection, and let outbreak clustering run as a swallowed side
/// effect of this request.
pub async fn analyze_detection(
    Extension(store): Extension<Arc<dyn EngineStore>>,
    Extension(classifier): Extension<Arc<ClassifierClient>>,
    Extension(enrichment): Extension<Arc<EnrichmentClient>>,
    Extension(pipeline): Extension<Arc<OutbreakPipeline>>,
    Path(pet_id): Path<Uuid>,
    Json(payload): Json<AnalyzeRequest>,
) -> Response {
    let pet = match store.pet(pet_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "Pet not found"})))
                .into_response()
        }
        Err(e) => return super::store_error(e),
    };

    let classification = match classifier.classify(&payload.image_path, &pet.species).await {
        Ok(c) => c,
        Err(CollabError::MissingFile(path)) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": format!("image file not found: {}", path)})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(pet_id = %pet_id, "Classification failed: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "analysis failed"})),
            )
                .into_response();
        }
    };

    let advice = enrichment
        .advise(
            &classification.prediction,
            classification.confidence,
            &pet.species,
            payload.notes.as_deref(),
        )
        .await;

    let now = Utc::now().naive_utc();
    let event = detection_event::Model {
        id: Uuid::new_v4(),
        pet_id,
        owner_id: pet.owner_id,
        species: pet.species.clone(),
        prediction: classification.prediction.clone(),
        confidence: classification.confidence,
        created_at: now,
    };
    pipeline.ingest_best_effort(event, now).await;

    (
        StatusCode::OK,
        Json(json!({
            "prediction": classification.prediction,
            "confidence": classification.confidence,
            "advice": advice,
        })),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
pub struct ReportDetectionRequest {
    pub pet_id: Uuid,
    pub prediction: String,
    pub confidence: f64,
}

/// Ingest an externally produced detection event. Writing the event is the
/// primary action; clustering stays best-effort.
pub async fn report_detection(
    Extension(store): Extension<Arc<dyn EngineStore>>,
    Extension(pipeline): Extension<Arc<OutbreakPipeline>>,
    Json(payload): Json<ReportDetectionRequest>,
) -> Response {
    if !(0.0..=1.0).contains(&payload.confidence) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "confidence must be within [0, 1]"})),
        )
            .into_response();
    }

    let pet = match store.pet(payload.pet_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "Pet not found"})))
                .into_response()
        }
        Err(e) => return super::store_error(e),
    };

    let now = Utc::now().naive_utc();
    let event = detection_event::Model {
        id: Uuid::new_v4(),
        pet_id: pet.id,
        owner_id: pet.owner_id,
        species: pet.species.clone(),
        prediction: payload.prediction,
        confidence: payload.confidence,
        created_at: now,
    };
    if let Err(e) = store.insert_detection(event.clone()).await {
        return super::store_error(e);
    }
    pipeline.process_best_effort(&event, now).await;

    (StatusCode::CREATED, Json(event)).into_response()
}
