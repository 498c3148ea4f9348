//! Alert fan-out: resolve every affected owner and deliver one notification
//! each, exactly once per alert.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::entities::alert_receipt::{self, AlertRef};
use crate::entities::outbreak_alert::{self, Severity};
use crate::entities::user;
use crate::error::StoreError;
use crate::notify::{kinds, NewNotification, NotificationSink};
use crate::store::EngineStore;

pub struct AlertFanout {
    store: Arc<dyn EngineStore>,
    sink: Arc<NotificationSink>,
}

impl AlertFanout {
    pub fn new(store: Arc<dyn EngineStore>, sink: Arc<NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Deliver the alert to every owner of a matching-species pet inside the
    /// alert's regions. Returns the number of recipients notified. Failures
    /// are isolated per recipient.
    pub async fn deliver(
        &self,
        alert: &outbreak_alert::Model,
        now: NaiveDateTime,
    ) -> Result<usize, StoreError> {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut notified = 0;

        for region in alert.regions() {
            let users = match self.store.users_in_city(&region.city).await {
                Ok(users) => users,
                Err(e) => {
                    tracing::error!(city = %region.city, "Fan-out recipient lookup failed: {}", e);
                    crate::metrics::swallowed_failure("fanout_lookup");
                    continue;
                }
            };
            for user in users {
                if !region.covers(&user.region()) {
                    continue;
                }
                // One notification per owner, however many regions or pets
                // they match through.
                if !seen.insert(user.id) {
                    continue;
                }
                match self.notify_owner(alert, &user, now).await {
                    Ok(true) => {
                        notified += 1;
                        crate::metrics::fanout_recipient(true);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(user_id = %user.id, alert_id = %alert.id, "Fan-out delivery failed: {}", e);
                        crate::metrics::fanout_recipient(false);
                        crate::metrics::swallowed_failure("fanout_recipient");
                    }
                }
            }
        }

        tracing::info!(alert_id = %alert.id, notified, "Alert fan-out complete");
        Ok(notified)
    }

    /// Returns Ok(false) when the user is not actually affected (no pet of
    /// the species) or was already notified for this alert.
    async fn notify_owner(
        &self,
        alert: &outbreak_alert::Model,
        user: &user::Model,
        now: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let owns_species = self
            .store
            .pets_owned_by(user.id)
            .await?
            .iter()
            .any(|p| p.species == alert.species);
        if !owns_species {
            return Ok(false);
        }

        let alert_ref = AlertRef::Outbreak(alert.id);
        if self
            .store
            .receipt_exists(user.id, alert_ref.kind(), alert_ref.id())
            .await?
        {
            return Ok(false);
        }

        let severity = match alert.severity.as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        };
        let region_scope = alert
            .regions()
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join("; ");
        // Notification first: a failed write must not leave a receipt behind,
        // or the dedup check would suppress redelivery forever.
        self.sink
            .create(
                NewNotification::new(
                    user.id,
                    kinds::OUTBREAK_ALERT,
                    format!(
                        "Health alert for {}: {} cases of {} reported among {}s near you.",
                        region_scope, alert.case_count, alert.disease, alert.species
                    ),
                )
                .link(format!("/alerts/{}", alert.id))
                .severity(severity)
                .alert(alert.id),
                now,
            )
            .await?;
        self.store
            .insert_receipt(alert_receipt::Model {
                id: Uuid::new_v4(),
                user_id: user.id,
                alert_kind: alert_ref.kind().to_string(),
                alert_id: alert_ref.id(),
                read: false,
                created_at: now,
            })
            .await?;
        Ok(true)
    }
}
