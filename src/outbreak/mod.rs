//! Outbreak detection pipeline: clustering detector plus alert fan-out.

pub mod detector;
pub mod fanout;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::entities::detection_event;
use crate::error::StoreError;
use crate::notify::NotificationSink;
use crate::store::EngineStore;

pub use detector::{DetectionOutcome, OutbreakDetector};
pub use fanout::AlertFanout;

pub struct OutbreakPipeline {
    store: Arc<dyn EngineStore>,
    pub detector: OutbreakDetector,
    pub fanout: AlertFanout,
}

impl OutbreakPipeline {
    pub fn new(store: Arc<dyn EngineStore>, sink: Arc<NotificationSink>) -> Self {
        Self {
            detector: OutbreakDetector::new(store.clone()),
            fanout: AlertFanout::new(store.clone(), sink),
            store,
        }
    }

    /// Persist the event, cluster it, and fan out on alert creation. An
    /// updated alert never re-triggers fan-out: its recipients were already
    /// notified once.
    pub async fn ingest(
        &self,
        event: detection_event::Model,
        now: NaiveDateTime,
    ) -> Result<DetectionOutcome, StoreError> {
        self.store.insert_detection(event.clone()).await?;
        self.process_and_fanout(&event, now).await
    }

    /// Cluster an already-persisted event and fan out on alert creation.
    pub async fn process_and_fanout(
        &self,
        event: &detection_event::Model,
        now: NaiveDateTime,
    ) -> Result<DetectionOutcome, StoreError> {
        let outcome = self.detector.process(event, now).await?;
        if let DetectionOutcome::AlertCreated(alert) = &outcome {
            self.fanout.deliver(alert, now).await?;
        }
        Ok(outcome)
    }

    /// Best-effort variant for use inside a primary request: any failure is
    /// logged and counted, never propagated.
    pub async fn ingest_best_effort(&self, event: detection_event::Model, now: NaiveDateTime) {
        if let Err(e) = self.ingest(event, now).await {
            tracing::error!("Outbreak detection failed: {}", e);
            crate::metrics::swallowed_failure("outbreak_detection");
        }
    }

    /// Clustering only, swallowing failures; used when the event itself was
    /// already written as a primary action.
    pub async fn process_best_effort(&self, event: &detection_event::Model, now: NaiveDateTime) {
        if let Err(e) = self.process_and_fanout(event, now).await {
            tracing::error!("Outbreak detection failed: {}", e);
            crate::metrics::swallowed_failure("outbreak_detection");
        }
    }
}
