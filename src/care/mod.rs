//! Temporary-Care State Machine.
//!
//! Caretaker assignments move `pending → active → {completed, canceled}`;
//! extension requests move `pending → {approved, rejected}` and stay in the
//! pet's history forever. Every transition is a whole-pet compare-and-swap
//! write, so a racing transition surfaces as a version conflict instead of a
//! silent lost update.

use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::entities::pet::{
    AdoptionStatus, CaretakerStatus, ExtensionRequest, ExtensionStatus, TemporaryCaretaker,
};
use crate::entities::pet;
use crate::error::EngineError;
use crate::notify::{kinds, NewNotification, NotificationSink};
use crate::scheduler;
use crate::store::EngineStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    NaturalExpiry,
    /// Owner ended the assignment early, optionally relisting the pet for
    /// adoption right away.
    OwnerEnded { relist: bool },
}

/// Outcome of `end_assignment`: the saved pet plus the assignment that ended,
/// so the caller can address the caretaker.
#[derive(Debug)]
pub struct EndedAssignment {
    pub pet: pet::Model,
    pub caretaker: TemporaryCaretaker,
}

pub struct CareService {
    store: Arc<dyn EngineStore>,
    sink: Arc<NotificationSink>,
}

impl CareService {
    pub fn new(store: Arc<dyn EngineStore>, sink: Arc<NotificationSink>) -> Self {
        Self { store, sink }
    }

    async fn load_pet(&self, pet_id: Uuid) -> Result<pet::Model, EngineError> {
        self.store
            .pet(pet_id)
            .await?
            .ok_or(EngineError::PetNotFound(pet_id))
    }

    /// Notifications are side effects of a transition, never the reason one
    /// fails: log, count, move on.
    async fn notify(&self, new: NewNotification, now: NaiveDateTime) {
        if let Err(e) = self.sink.create(new, now).await {
            tracing::error!("Failed to write care notification: {}", e);
            crate::metrics::swallowed_failure("care_notification");
        }
    }

    pub async fn begin_temporary_care(
        &self,
        pet_id: Uuid,
        caretaker_id: Uuid,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<pet::Model, EngineError> {
        let mut pet = self.load_pet(pet_id).await?;

        if let Some(existing) = pet.temporary_caretaker() {
            if !existing.status.is_terminal() {
                return Err(EngineError::InvalidTransition(format!(
                    "pet {} already has a caretaker assignment",
                    pet_id
                )));
            }
        }

        pet.set_caretaker(Some(TemporaryCaretaker {
            caretaker_id,
            start_date,
            end_date,
            status: CaretakerStatus::Active,
        }));
        pet.set_adoption(AdoptionStatus::TemporarilyAdopted);
        pet.updated_at = now;
        let pet = self.save(pet).await?;

        self.store
            .upsert_schedule(scheduler::schedule_row(pet_id, end_date, now))
            .await?;

        self.notify(
            NewNotification::new(
                caretaker_id,
                kinds::TEMPORARY_CARE,
                format!(
                    "You are now the temporary caretaker of {} until {}.",
                    pet.name,
                    end_date.format("%Y-%m-%d")
                ),
            )
            .link(format!("/pets/{}", pet_id))
            .pet(pet_id),
            now,
        )
        .await;
        self.notify(
            NewNotification::new(
                pet.owner_id,
                kinds::TEMPORARY_CARE,
                format!(
                    "{} is in temporary care until {}.",
                    pet.name,
                    end_date.format("%Y-%m-%d")
                ),
            )
            .link(format!("/pets/{}", pet_id))
            .pet(pet_id),
            now,
        )
        .await;

        Ok(pet)
    }

    pub async fn request_extension(
        &self,
        pet_id: Uuid,
        new_end_date: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<ExtensionRequest, EngineError> {
        let mut pet = self.load_pet(pet_id).await?;
        let caretaker = pet.active_caretaker().ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "pet {} has no active caretaker assignment",
                pet_id
            ))
        })?;

        let request = ExtensionRequest {
            id: Uuid::new_v4(),
            caretaker_id: caretaker.caretaker_id,
            status: ExtensionStatus::Pending,
            requested_end_date: new_end_date,
            requested_at: now,
            responded_at: None,
        };

        let mut history = pet.extensions();
        history.push(request.clone());
        pet.set_extensions(history);
        pet.updated_at = now;
        let pet = self.save(pet).await?;

        self.notify(
            NewNotification::new(
                caretaker.caretaker_id,
                kinds::EXTENSION_REQUEST,
                format!(
                    "The owner of {} asks to extend temporary care until {}.",
                    pet.name,
                    new_end_date.format("%Y-%m-%d")
                ),
            )
            .link(format!("/pets/{}", pet_id))
            .pet(pet_id),
            now,
        )
        .await;

        Ok(request)
    }

    pub async fn respond_to_extension(
        &self,
        pet_id: Uuid,
        request_id: Uuid,
        approve: bool,
        now: NaiveDateTime,
    ) -> Result<pet::Model, EngineError> {
        let mut pet = self.load_pet(pet_id).await?;

        let mut history = pet.extensions();
        let request = history
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| {
                EngineError::InvalidTransition(format!("unknown extension request {}", request_id))
            })?;
        if request.status != ExtensionStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "extension request {} is already resolved",
                request_id
            )));
        }

        request.responded_at = Some(now);
        let new_end = request.requested_end_date;
        if approve {
            request.status = ExtensionStatus::Approved;
        } else {
            request.status = ExtensionStatus::Rejected;
        }
        pet.set_extensions(history);

        let mut caretaker = pet.active_caretaker().ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "pet {} has no active caretaker assignment",
                pet_id
            ))
        })?;
        if approve {
            caretaker.end_date = new_end;
            pet.set_caretaker(Some(caretaker.clone()));
        }
        pet.updated_at = now;
        let pet = self.save(pet).await?;

        if approve {
            // Reschedule: the existing job row is simply rewritten.
            self.store
                .upsert_schedule(scheduler::schedule_row(pet_id, new_end, now))
                .await?;
        }

        let verdict = if approve { "approved" } else { "declined" };
        let message = format!(
            "The extension request for {} was {}.",
            pet.name, verdict
        );
        for recipient in [pet.owner_id, caretaker.caretaker_id] {
            self.notify(
                NewNotification::new(recipient, kinds::EXTENSION_RESPONSE, message.clone())
                    .link(format!("/pets/{}", pet_id))
                    .pet(pet_id),
                now,
            )
            .await;
        }

        Ok(pet)
    }

    /// Terminal transition, invoked by the scheduler at hard expiration or by
    /// the owner keeping the pet. Rejects when no active assignment exists,
    /// which is what makes duplicate expiry firing a harmless no-op.
    pub async fn end_assignment(
        &self,
        pet_id: Uuid,
        reason: EndReason,
        now: NaiveDateTime,
    ) -> Result<EndedAssignment, EngineError> {
        let mut pet = self.load_pet(pet_id).await?;
        let mut caretaker = pet.active_caretaker().ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "pet {} has no active caretaker assignment",
                pet_id
            ))
        })?;

        caretaker.status = match reason {
            EndReason::NaturalExpiry => CaretakerStatus::Completed,
            EndReason::OwnerEnded { .. } => CaretakerStatus::Canceled,
        };
        let next_status = match reason {
            EndReason::NaturalExpiry => AdoptionStatus::NotAvailable,
            EndReason::OwnerEnded { relist: true } => AdoptionStatus::Available,
            EndReason::OwnerEnded { relist: false } => AdoptionStatus::NotAvailable,
        };

        // The finished assignment leaves the document; the extension history
        // stays behind.
        pet.set_caretaker(None);
        pet.set_adoption(next_status);
        pet.updated_at = now;
        let pet = self.save(pet).await?;

        self.store.delete_schedule(pet_id).await?;

        if let EndReason::OwnerEnded { .. } = reason {
            self.notify(
                NewNotification::new(
                    caretaker.caretaker_id,
                    kinds::CARE_EXPIRED,
                    format!("The owner of {} has ended the temporary care period.", pet.name),
                )
                .pet(pet_id),
                now,
            )
            .await;
        }

        Ok(EndedAssignment { pet, caretaker })
    }

    async fn save(&self, pet: pet::Model) -> Result<pet::Model, EngineError> {
        let id = pet.id;
        self.store.save_pet(pet).await.map_err(|e| match e {
            crate::error::StoreError::VersionConflict => EngineError::VersionConflict(id),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{pet, user};
    use crate::error::StoreError;
    use crate::notify::LocalLiveRegistry;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        care: CareService,
        sink: Arc<NotificationSink>,
    }

    fn fixture() -> Fixture {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let sink = Arc::new(NotificationSink::new(
            store.clone(),
            Arc::new(LocalLiveRegistry::new()),
        ));
        let care = CareService::new(store.clone(), sink.clone());
        Fixture { store, care, sink }
    }

    async fn seed_pet(store: &MemoryStore, now: NaiveDateTime) -> pet::Model {
        let owner_id = Uuid::new_v4();
        let owner = user::Model {
            id: owner_id,
            name: "Mira".to_string(),
            city: "Haifa".to_string(),
            village: None,
            created_at: now,
        };
        store.insert_user(owner).await.unwrap();
        let p = pet::Model {
            id: Uuid::new_v4(),
            owner_id,
            name: "Biscuit".to_string(),
            species: "dog".to_string(),
            adoption_status: AdoptionStatus::Available.as_str().to_string(),
            caretaker: None,
            extension_requests: serde_json::json!([]),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        store.insert_pet(p.clone()).await.unwrap();
        p
    }

    #[tokio::test]
    async fn begin_assigns_caretaker_and_schedules_expiration() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        let caretaker_id = Uuid::new_v4();

        let saved = f
            .care
            .begin_temporary_care(pet.id, caretaker_id, now, at(20, 9), now)
            .await
            .unwrap();

        assert_eq!(saved.adoption(), Some(AdoptionStatus::TemporarilyAdopted));
        let assignment = saved.active_caretaker().unwrap();
        assert_eq!(assignment.caretaker_id, caretaker_id);
        assert_eq!(assignment.end_date, at(20, 9));

        let row = f.store.schedule_for_pet(pet.id).await.unwrap().unwrap();
        assert_eq!(row.end_date, at(20, 9));

        let to_caretaker = f.sink.user_notifications(caretaker_id).await.unwrap();
        let to_owner = f.sink.user_notifications(pet.owner_id).await.unwrap();
        assert_eq!(to_caretaker.len(), 1);
        assert_eq!(to_owner.len(), 1);
        assert_eq!(to_caretaker[0].kind, kinds::TEMPORARY_CARE);
    }

    #[tokio::test]
    async fn begin_rejects_while_assignment_is_live() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(20, 9), now)
            .await
            .unwrap();

        let err = f
            .care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(25, 9), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn begin_allowed_again_after_assignment_ends() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(20, 9), now)
            .await
            .unwrap();
        f.care
            .end_assignment(pet.id, EndReason::OwnerEnded { relist: true }, at(5, 9))
            .await
            .unwrap();

        let saved = f
            .care
            .begin_temporary_care(pet.id, Uuid::new_v4(), at(6, 9), at(28, 9), at(6, 9))
            .await
            .unwrap();
        assert!(saved.active_caretaker().is_some());
    }

    #[tokio::test]
    async fn extension_requires_active_assignment() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;

        let err = f
            .care
            .request_extension(pet.id, at(30, 9), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn approving_extension_moves_end_date_and_reschedules() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();
        let request = f
            .care
            .request_extension(pet.id, at(25, 9), at(2, 9))
            .await
            .unwrap();

        let saved = f
            .care
            .respond_to_extension(pet.id, request.id, true, at(3, 9))
            .await
            .unwrap();

        assert_eq!(saved.active_caretaker().unwrap().end_date, at(25, 9));
        let history = saved.extensions();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ExtensionStatus::Approved);
        assert_eq!(history[0].responded_at, Some(at(3, 9)));

        let row = f.store.schedule_for_pet(pet.id).await.unwrap().unwrap();
        assert_eq!(row.end_date, at(25, 9));
    }

    #[tokio::test]
    async fn rejecting_extension_keeps_end_date_and_schedule() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();
        let request = f
            .care
            .request_extension(pet.id, at(25, 9), at(2, 9))
            .await
            .unwrap();

        let saved = f
            .care
            .respond_to_extension(pet.id, request.id, false, at(3, 9))
            .await
            .unwrap();

        assert_eq!(saved.active_caretaker().unwrap().end_date, at(10, 9));
        assert_eq!(saved.extensions()[0].status, ExtensionStatus::Rejected);
        let row = f.store.schedule_for_pet(pet.id).await.unwrap().unwrap();
        assert_eq!(row.end_date, at(10, 9));
    }

    #[tokio::test]
    async fn resolved_extension_cannot_be_answered_twice() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();
        let request = f
            .care
            .request_extension(pet.id, at(25, 9), at(2, 9))
            .await
            .unwrap();
        f.care
            .respond_to_extension(pet.id, request.id, false, at(3, 9))
            .await
            .unwrap();

        let err = f
            .care
            .respond_to_extension(pet.id, request.id, true, at(4, 9))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn extension_history_is_append_only() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();
        let first = f
            .care
            .request_extension(pet.id, at(15, 9), at(2, 9))
            .await
            .unwrap();
        f.care
            .respond_to_extension(pet.id, first.id, false, at(3, 9))
            .await
            .unwrap();
        let second = f
            .care
            .request_extension(pet.id, at(20, 9), at(4, 9))
            .await
            .unwrap();
        let saved = f
            .care
            .respond_to_extension(pet.id, second.id, true, at(5, 9))
            .await
            .unwrap();

        let history = saved.extensions();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, ExtensionStatus::Rejected);
        assert_eq!(history[1].status, ExtensionStatus::Approved);
    }

    #[tokio::test]
    async fn owner_end_with_relist_makes_pet_available() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        let caretaker_id = Uuid::new_v4();
        f.care
            .begin_temporary_care(pet.id, caretaker_id, now, at(20, 9), now)
            .await
            .unwrap();

        let ended = f
            .care
            .end_assignment(pet.id, EndReason::OwnerEnded { relist: true }, at(5, 9))
            .await
            .unwrap();

        assert_eq!(ended.pet.adoption(), Some(AdoptionStatus::Available));
        assert!(ended.pet.temporary_caretaker().is_none());
        assert_eq!(ended.caretaker.status, CaretakerStatus::Canceled);
        assert!(f.store.schedule_for_pet(pet.id).await.unwrap().is_none());

        let to_caretaker = f.sink.user_notifications(caretaker_id).await.unwrap();
        assert!(to_caretaker
            .iter()
            .any(|n| n.kind == kinds::CARE_EXPIRED && n.message.contains("ended")));
    }

    #[tokio::test]
    async fn natural_expiry_completes_and_withdraws_pet() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();

        let ended = f
            .care
            .end_assignment(pet.id, EndReason::NaturalExpiry, at(10, 10))
            .await
            .unwrap();

        assert_eq!(ended.pet.adoption(), Some(AdoptionStatus::NotAvailable));
        assert_eq!(ended.caretaker.status, CaretakerStatus::Completed);
    }

    #[tokio::test]
    async fn ending_twice_is_rejected() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;
        f.care
            .begin_temporary_care(pet.id, Uuid::new_v4(), now, at(10, 9), now)
            .await
            .unwrap();
        f.care
            .end_assignment(pet.id, EndReason::NaturalExpiry, at(10, 10))
            .await
            .unwrap();

        let err = f
            .care
            .end_assignment(pet.id, EndReason::NaturalExpiry, at(10, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn stale_writer_loses_version_race() {
        let f = fixture();
        let now = at(1, 9);
        let pet = seed_pet(&f.store, now).await;

        let stale = f.store.pet(pet.id).await.unwrap().unwrap();
        f.store.save_pet(stale.clone()).await.unwrap();

        let err = f.store.save_pet(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict));
    }
}
