//! Persistence seam for the engine.
//!
//! Every component talks to an `EngineStore` rather than a database handle,
//! so the care state machine, scheduler and outbreak pipeline run unchanged
//! against Postgres in production and the in-memory store in tests.

pub mod memory;
pub mod orm;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::entities::{
    alert_receipt, care_schedule, detection_event, notification, outbreak_alert, pet, user,
};
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use orm::OrmStore;

#[async_trait]
pub trait EngineStore: Send + Sync {
    // Pets
    async fn pet(&self, id: Uuid) -> Result<Option<pet::Model>, StoreError>;
    async fn insert_pet(&self, pet: pet::Model) -> Result<(), StoreError>;
    /// Whole-document write guarded by `pet.version`: fails with
    /// `VersionConflict` unless the stored version still matches, and returns
    /// the model with the version bumped.
    async fn save_pet(&self, pet: pet::Model) -> Result<pet::Model, StoreError>;
    async fn pets_owned_by(&self, owner_id: Uuid) -> Result<Vec<pet::Model>, StoreError>;
    /// Pets currently in temporary care, i.e. holding an active assignment.
    async fn pets_in_temporary_care(&self) -> Result<Vec<pet::Model>, StoreError>;

    // Users
    async fn user(&self, id: Uuid) -> Result<Option<user::Model>, StoreError>;
    async fn insert_user(&self, user: user::Model) -> Result<(), StoreError>;
    async fn users_in_city(&self, city: &str) -> Result<Vec<user::Model>, StoreError>;

    // Detection events
    async fn insert_detection(&self, event: detection_event::Model) -> Result<(), StoreError>;
    /// Detections with the given species and prediction, confidence strictly
    /// above `min_confidence`, created at or after `since`.
    async fn detections_matching(
        &self,
        species: &str,
        prediction: &str,
        min_confidence: f64,
        since: NaiveDateTime,
    ) -> Result<Vec<detection_event::Model>, StoreError>;

    // Outbreak alerts
    async fn alert(&self, id: Uuid) -> Result<Option<outbreak_alert::Model>, StoreError>;
    async fn insert_alert(&self, alert: outbreak_alert::Model) -> Result<(), StoreError>;
    async fn update_alert(&self, alert: outbreak_alert::Model) -> Result<(), StoreError>;
    async fn active_alerts(
        &self,
        disease: &str,
        species: &str,
    ) -> Result<Vec<outbreak_alert::Model>, StoreError>;
    async fn all_active_alerts(&self) -> Result<Vec<outbreak_alert::Model>, StoreError>;

    // Alert receipts
    async fn insert_receipt(&self, receipt: alert_receipt::Model) -> Result<(), StoreError>;
    async fn receipt_exists(
        &self,
        user_id: Uuid,
        alert_kind: &str,
        alert_id: Uuid,
    ) -> Result<bool, StoreError>;
    async fn mark_receipt_read(
        &self,
        id: Uuid,
    ) -> Result<alert_receipt::Model, StoreError>;

    // Notifications
    async fn insert_notification(&self, n: notification::Model) -> Result<(), StoreError>;
    /// All notifications for a user, newest first.
    async fn notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, StoreError>;
    async fn mark_notification_read(
        &self,
        id: Uuid,
    ) -> Result<notification::Model, StoreError>;

    // Care schedules
    async fn upsert_schedule(&self, job: care_schedule::Model) -> Result<(), StoreError>;
    async fn schedule_for_pet(
        &self,
        pet_id: Uuid,
    ) -> Result<Option<care_schedule::Model>, StoreError>;
    async fn due_schedules(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<care_schedule::Model>, StoreError>;
    async fn delete_schedule(&self, pet_id: Uuid) -> Result<(), StoreError>;
}
