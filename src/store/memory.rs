//! In-memory `EngineStore`, used by the test suite and handy for local runs
//! without a database. Same visibility idea as a mock provider: a real
//! module, not test-gated, so integration tests can build full engines on it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::pet::CaretakerStatus;
use crate::entities::{
    alert_receipt, care_schedule, detection_event, notification, outbreak_alert, pet, user,
};
use crate::error::StoreError;

use super::EngineStore;

#[derive(Default)]
struct Inner {
    pets: HashMap<Uuid, pet::Model>,
    users: HashMap<Uuid, user::Model>,
    detections: Vec<detection_event::Model>,
    alerts: HashMap<Uuid, outbreak_alert::Model>,
    receipts: HashMap<Uuid, alert_receipt::Model>,
    notifications: HashMap<Uuid, notification::Model>,
    schedules: HashMap<Uuid, care_schedule::Model>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn pet(&self, id: Uuid) -> Result<Option<pet::Model>, StoreError> {
        Ok(self.inner.read().await.pets.get(&id).cloned())
    }

    async fn insert_pet(&self, pet: pet::Model) -> Result<(), StoreError> {
        self.inner.write().await.pets.insert(pet.id, pet);
        Ok(())
    }

    async fn save_pet(&self, mut pet: pet::Model) -> Result<pet::Model, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.pets.get(&pet.id).ok_or(StoreError::NotFound)?;
        if stored.version != pet.version {
            return Err(StoreError::VersionConflict);
        }
        pet.version += 1;
        inner.pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn pets_owned_by(&self, owner_id: Uuid) -> Result<Vec<pet::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .pets
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn pets_in_temporary_care(&self) -> Result<Vec<pet::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .pets
            .values()
            .filter(|p| {
                p.temporary_caretaker()
                    .map(|c| c.status == CaretakerStatus::Active)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn user(&self, id: Uuid) -> Result<Option<user::Model>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: user::Model) -> Result<(), StoreError> {
        self.inner.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn users_in_city(&self, city: &str) -> Result<Vec<user::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .filter(|u| u.city == city)
            .cloned()
            .collect())
    }

    async fn insert_detection(&self, event: detection_event::Model) -> Result<(), StoreError> {
        self.inner.write().await.detections.push(event);
        Ok(())
    }

    async fn detections_matching(
        &self,
        species: &str,
        prediction: &str,
        min_confidence: f64,
        since: NaiveDateTime,
    ) -> Result<Vec<detection_event::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .detections
            .iter()
            .filter(|d| {
                d.species == species
                    && d.prediction == prediction
                    && d.confidence > min_confidence
                    && d.created_at >= since
            })
            .cloned()
            .collect())
    }

    async fn alert(&self, id: Uuid) -> Result<Option<outbreak_alert::Model>, StoreError> {
        Ok(self.inner.read().await.alerts.get(&id).cloned())
    }

    async fn insert_alert(&self, alert: outbreak_alert::Model) -> Result<(), StoreError> {
        self.inner.write().await.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn update_alert(&self, alert: outbreak_alert::Model) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.alerts.contains_key(&alert.id) {
            return Err(StoreError::NotFound);
        }
        inner.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn active_alerts(
        &self,
        disease: &str,
        species: &str,
    ) -> Result<Vec<outbreak_alert::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .alerts
            .values()
            .filter(|a| a.is_active && a.disease == disease && a.species == species)
            .cloned()
            .collect())
    }

    async fn all_active_alerts(&self) -> Result<Vec<outbreak_alert::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .alerts
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn insert_receipt(&self, receipt: alert_receipt::Model) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .receipts
            .insert(receipt.id, receipt);
        Ok(())
    }

    async fn receipt_exists(
        &self,
        user_id: Uuid,
        alert_kind: &str,
        alert_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.receipts.values().any(|r| {
            r.user_id == user_id && r.alert_kind == alert_kind && r.alert_id == alert_id
        }))
    }

    async fn mark_receipt_read(&self, id: Uuid) -> Result<alert_receipt::Model, StoreError> {
        let mut inner = self.inner.write().await;
        let receipt = inner.receipts.get_mut(&id).ok_or(StoreError::NotFound)?;
        receipt.read = true;
        Ok(receipt.clone())
    }

    async fn insert_notification(&self, n: notification::Model) -> Result<(), StoreError> {
        self.inner.write().await.notifications.insert(n.id, n);
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, StoreError> {
        let mut list: Vec<notification::Model> = self
            .inner
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
    ) -> Result<notification::Model, StoreError> {
        let mut inner = self.inner.write().await;
        let n = inner.notifications.get_mut(&id).ok_or(StoreError::NotFound)?;
        n.read = true;
        Ok(n.clone())
    }

    async fn upsert_schedule(&self, job: care_schedule::Model) -> Result<(), StoreError> {
        self.inner.write().await.schedules.insert(job.pet_id, job);
        Ok(())
    }

    async fn schedule_for_pet(
        &self,
        pet_id: Uuid,
    ) -> Result<Option<care_schedule::Model>, StoreError> {
        Ok(self.inner.read().await.schedules.get(&pet_id).cloned())
    }

    async fn due_schedules(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<care_schedule::Model>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .schedules
            .values()
            .filter(|s| s.next_wake_at <= now)
            .cloned()
            .collect())
    }

    async fn delete_schedule(&self, pet_id: Uuid) -> Result<(), StoreError> {
        self.inner.write().await.schedules.remove(&pet_id);
        Ok(())
    }
}
