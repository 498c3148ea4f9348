//! Notification sink: persists a per-user message record, then best-effort
//! pushes it over a live connection if one exists.

pub mod live;

use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::entities::notification;
use crate::entities::outbreak_alert::Severity;
use crate::error::StoreError;
use crate::store::EngineStore;

pub use live::{LiveChannel, LocalLiveRegistry};

/// Notification type tags.
pub mod kinds {
    pub const TEMPORARY_CARE: &str = "temporaryCare";
    pub const EXTENSION_REQUEST: &str = "extensionRequest";
    pub const EXTENSION_RESPONSE: &str = "extensionResponse";
    pub const CARE_REMINDER: &str = "careReminder";
    pub const CARE_EXPIRED: &str = "careExpired";
    pub const OUTBREAK_ALERT: &str = "outbreakAlert";
}

pub struct NewNotification {
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub kind: &'static str,
    pub severity: Option<Severity>,
    pub pet_id: Option<Uuid>,
    pub alert_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            link: None,
            kind,
            severity: None,
            pet_id: None,
            alert_id: None,
        }
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn pet(mut self, pet_id: Uuid) -> Self {
        self.pet_id = Some(pet_id);
        self
    }

    pub fn alert(mut self, alert_id: Uuid) -> Self {
        self.alert_id = Some(alert_id);
        self
    }
}

pub struct NotificationSink {
    store: Arc<dyn EngineStore>,
    live: Arc<dyn LiveChannel>,
}

impl NotificationSink {
    pub fn new(store: Arc<dyn EngineStore>, live: Arc<dyn LiveChannel>) -> Self {
        Self { store, live }
    }

    /// Persist the notification, then attempt a live push. The push result
    /// only feeds metrics; delivery over the durable record always counts.
    pub async fn create(
        &self,
        new: NewNotification,
        now: NaiveDateTime,
    ) -> Result<notification::Model, StoreError> {
        let model = notification::Model {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            message: new.message,
            link: new.link,
            kind: new.kind.to_string(),
            severity: new.severity.map(|s| s.as_str().to_string()),
            pet_id: new.pet_id,
            alert_id: new.alert_id,
            read: false,
            created_at: now,
        };
        self.store.insert_notification(model.clone()).await?;
        crate::metrics::notification_created(new.kind);

        let envelope = serde_json::json!({
            "type": "notification",
            "notification": model,
        });
        let delivered = self.live.push(model.user_id, envelope).await;
        crate::metrics::live_push(delivered);
        if !delivered {
            tracing::debug!(user_id = %model.user_id, "no live connection, durable record only");
        }

        Ok(model)
    }

    pub async fn user_notifications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, StoreError> {
        self.store.notifications_for_user(user_id).await
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<notification::Model, StoreError> {
        self.store.mark_notification_read(id).await
    }
}
