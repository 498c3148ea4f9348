//! Spatio-temporal clustering of detection events into outbreak alerts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::entities::detection_event;
use crate::entities::outbreak_alert::{self, Region, Severity};
use crate::error::StoreError;
use crate::store::EngineStore;

/// Detections at or below this confidence never participate in clustering.
pub const MIN_CONFIDENCE: f64 = 0.30;
/// Trailing window candidate detections are drawn from.
pub const CLUSTER_WINDOW_HOURS: i64 = 48;
/// Matching prior cases needed to confirm an outbreak (3 cases total with
/// the trigger).
pub const MIN_MATCHING_CANDIDATES: usize = 2;

pub fn severity_for(avg_confidence: f64, case_count: i32) -> Severity {
    if avg_confidence > 0.8 || case_count > 5 {
        Severity::High
    } else if avg_confidence > 0.3 || case_count > 3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[derive(Debug)]
pub enum DetectionOutcome {
    /// Below the confidence floor, a healthy prediction, or no region to
    /// match against.
    Ignored,
    /// Not enough matching cases in the window.
    NoCluster,
    AlertCreated(outbreak_alert::Model),
    AlertUpdated(outbreak_alert::Model),
}

pub struct OutbreakDetector {
    store: Arc<dyn EngineStore>,
}

impl OutbreakDetector {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Cluster the event against recent matching detections and create or
    /// update an alert. Runs synchronously inside the reporting request; the
    /// caller decides whether failures propagate.
    pub async fn process(
        &self,
        event: &detection_event::Model,
        now: NaiveDateTime,
    ) -> Result<DetectionOutcome, StoreError> {
        if event.confidence <= MIN_CONFIDENCE
            || event.prediction.eq_ignore_ascii_case("healthy")
        {
            return Ok(DetectionOutcome::Ignored);
        }

        let trigger_region = match self.store.user(event.owner_id).await? {
            Some(owner) => owner.region(),
            None => {
                tracing::warn!(owner_id = %event.owner_id, "Trigger owner missing, cannot geolocate detection");
                return Ok(DetectionOutcome::Ignored);
            }
        };

        let since = now - Duration::hours(CLUSTER_WINDOW_HOURS);
        let candidates = self
            .store
            .detections_matching(&event.species, &event.prediction, MIN_CONFIDENCE, since)
            .await?;

        let mut matching: Vec<(detection_event::Model, Region)> = Vec::new();
        for candidate in candidates {
            if candidate.id == event.id {
                continue;
            }
            let region = self.region_of(&candidate, &trigger_region).await?;
            if region.same_locality(&trigger_region) {
                matching.push((candidate, region));
            }
        }

        if matching.len() < MIN_MATCHING_CANDIDATES {
            return Ok(DetectionOutcome::NoCluster);
        }

        // Update path: a live alert for this disease already covers the
        // trigger's locality, so fold the new case in instead of duplicating.
        let active = self
            .store
            .active_alerts(&event.prediction, &event.species)
            .await?;
        if let Some(existing) = active
            .into_iter()
            .find(|a| a.regions().iter().any(|r| r.same_locality(&trigger_region)))
        {
            let mut updated = existing;
            let folded = updated.avg_confidence * updated.case_count as f64 + event.confidence;
            updated.case_count += 1;
            updated.avg_confidence = folded / updated.case_count as f64;
            let mut ids = updated.detection_ids();
            ids.push(event.id);
            updated.set_detection_ids(ids);
            updated.updated_at = now;
            self.store.update_alert(updated.clone()).await?;
            crate::metrics::outbreak_alert_updated();
            tracing::info!(
                alert_id = %updated.id,
                case_count = updated.case_count,
                "Folded detection into active outbreak alert"
            );
            return Ok(DetectionOutcome::AlertUpdated(updated));
        }

        let case_count = (matching.len() + 1) as i32;
        let total_confidence: f64 = matching
            .iter()
            .map(|(d, _)| d.confidence)
            .sum::<f64>()
            + event.confidence;
        let avg_confidence = total_confidence / case_count as f64;

        let mut regions: HashSet<Region> = HashSet::new();
        regions.insert(trigger_region.clone());
        for (_, region) in &matching {
            regions.insert(region.clone());
        }
        let regions: Vec<Region> = regions.into_iter().collect();

        let severity = severity_for(avg_confidence, case_count);
        let scope = trigger_region.label();
        let mut detection_ids: Vec<Uuid> = matching.iter().map(|(d, _)| d.id).collect();
        detection_ids.push(event.id);

        let alert = outbreak_alert::Model {
            id: Uuid::new_v4(),
            disease: event.prediction.clone(),
            species: event.species.clone(),
            regions: serde_json::to_value(&regions).unwrap_or(serde_json::json!([])),
            case_count,
            avg_confidence,
            severity: severity.as_str().to_string(),
            message: format!(
                "Possible {} outbreak among {}s in {}: {} cases reported within the last {} hours.",
                event.prediction, event.species, scope, case_count, CLUSTER_WINDOW_HOURS
            ),
            recommendations: serde_json::to_value(recommendations_for(
                &event.prediction,
                &event.species,
                &scope,
            ))
            .unwrap_or(serde_json::json!([])),
            detection_ids: serde_json::to_value(&detection_ids).unwrap_or(serde_json::json!([])),
            is_active: true,
            started_at: now,
            ended_at: None,
            updated_at: now,
        };
        self.store.insert_alert(alert.clone()).await?;
        crate::metrics::outbreak_alert_created(severity.as_str());
        tracing::warn!(
            alert_id = %alert.id,
            disease = %alert.disease,
            species = %alert.species,
            case_count,
            severity = severity.as_str(),
            "Outbreak alert created"
        );
        Ok(DetectionOutcome::AlertCreated(alert))
    }

    /// Deactivate an alert. The engine never does this on its own; it is the
    /// explicit end-of-outbreak operation.
    pub async fn deactivate_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<outbreak_alert::Model, StoreError> {
        let mut alert = self
            .store
            .alert(alert_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        alert.is_active = false;
        let now = Utc::now().naive_utc();
        alert.ended_at = Some(now);
        alert.updated_at = now;
        self.store.update_alert(alert.clone()).await?;
        Ok(alert)
    }

    async fn region_of(
        &self,
        candidate: &detection_event::Model,
        fallback: &Region,
    ) -> Result<Region, StoreError> {
        Ok(self
            .store
            .user(candidate.owner_id)
            .await?
            .map(|u| u.region())
            .unwrap_or_else(|| fallback.clone()))
    }
}

fn recommendations_for(disease: &str, species: &str, scope: &str) -> Vec<String> {
    vec![
        format!(
            "Keep your {} away from other animals in {} until the outbreak subsides.",
            species, scope
        ),
        format!(
            "Watch for symptoms of {} and contact a veterinarian if any appear.",
            disease
        ),
        "Disinfect shared bowls, bedding and outdoor areas regularly.".to_string(),
    ]
}
