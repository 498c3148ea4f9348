//! Expiration scheduler for temporary-care assignments.
//!
//! Instead of one live timer per assignment, every active assignment owns a
//! durable `care_schedules` row holding the next stage to fire and when. A
//! single poll loop wakes due rows; the daily sweep repairs rows lost to
//! restarts and then drains anything overdue. Delivery is at-least-once, so
//! every stage handler re-reads the pet and no-ops when the assignment is no
//! longer active.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use tokio::signal;
use tokio::time;
use uuid::Uuid;

use crate::care::{CareService, EndReason};
use crate::entities::care_schedule::{self, Stage};
use crate::entities::pet::ExtensionStatus;
use crate::error::{EngineError, StoreError};
use crate::notify::{kinds, NewNotification, NotificationSink};
use crate::store::EngineStore;

/// First stage applicable to an assignment ending at `end_date`, seen from
/// `now`. Warnings only exist while at least that many whole days remain;
/// an already-elapsed end date goes straight to expiry.
pub fn first_stage(end_date: NaiveDateTime, now: NaiveDateTime) -> (Stage, NaiveDateTime) {
    let remaining = end_date - now;
    if remaining > Duration::days(3) {
        (Stage::Warning3, end_date - Duration::days(3))
    } else if remaining > Duration::days(2) {
        (Stage::Warning2, end_date - Duration::days(2))
    } else if remaining > Duration::days(1) {
        (Stage::Warning1, end_date - Duration::days(1))
    } else if remaining > Duration::zero() {
        (Stage::LastDay, end_date)
    } else {
        (Stage::Expiry, now)
    }
}

/// Build the schedule row registering (or re-registering) an assignment.
pub fn schedule_row(
    pet_id: Uuid,
    end_date: NaiveDateTime,
    now: NaiveDateTime,
) -> care_schedule::Model {
    let (stage, wake) = first_stage(end_date, now);
    care_schedule::Model {
        pet_id,
        end_date,
        next_stage: stage.as_str().to_string(),
        next_wake_at: wake,
        created_at: now,
        updated_at: now,
    }
}

pub struct ExpirationScheduler {
    store: Arc<dyn EngineStore>,
    care: Arc<CareService>,
    sink: Arc<NotificationSink>,
}

impl ExpirationScheduler {
    pub fn new(
        store: Arc<dyn EngineStore>,
        care: Arc<CareService>,
        sink: Arc<NotificationSink>,
    ) -> Self {
        Self { store, care, sink }
    }

    /// Idempotent registration: begin and extension approval both land here.
    pub async fn register_assignment(
        &self,
        pet_id: Uuid,
        end_date: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.store
            .upsert_schedule(schedule_row(pet_id, end_date, now))
            .await
    }

    /// Fire every due schedule row. Per-row failures are logged and counted;
    /// one bad row never stalls the rest.
    pub async fn process_due(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let due = self.store.due_schedules(now).await?;
        let mut fired = 0;
        for row in due {
            match self.fire(&row, now).await {
                Ok(did_fire) => {
                    if did_fire {
                        fired += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(pet_id = %row.pet_id, "Scheduler stage failed: {}", e);
                    crate::metrics::swallowed_failure("scheduler_stage");
                }
            }
        }
        Ok(fired)
    }

    /// Daily reconciliation: re-register any active assignment whose schedule
    /// row went missing, resync rows that drifted from the pet document, then
    /// drain overdue rows.
    pub async fn run_daily_sweep(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let in_care = self.store.pets_in_temporary_care().await?;
        for pet in in_care {
            let caretaker = match pet.active_caretaker() {
                Some(c) => c,
                None => continue,
            };
            let needs_repair = match self.store.schedule_for_pet(pet.id).await? {
                Some(row) => row.end_date != caretaker.end_date,
                None => true,
            };
            if needs_repair {
                tracing::warn!(pet_id = %pet.id, "Sweep re-registering assignment schedule");
                self.register_assignment(pet.id, caretaker.end_date, now)
                    .await?;
                crate::metrics::sweep_repaired_schedule();
            }
        }
        let fired = self.process_due(now).await?;
        tracing::info!("Daily sweep complete, {} stage(s) fired", fired);
        Ok(fired)
    }

    /// Fire one row's stage. Returns false for the no-op paths: stale row,
    /// drifted end date, or an assignment that already ended.
    async fn fire(&self, row: &care_schedule::Model, now: NaiveDateTime) -> Result<bool, EngineError> {
        let pet = match self.store.pet(row.pet_id).await? {
            Some(p) => p,
            None => {
                self.store.delete_schedule(row.pet_id).await?;
                return Ok(false);
            }
        };

        // State re-check: the row only acts if the assignment it was created
        // for is still the live one.
        let caretaker = match pet.active_caretaker() {
            Some(c) => c,
            None => {
                self.store.delete_schedule(row.pet_id).await?;
                return Ok(false);
            }
        };
        if caretaker.end_date != row.end_date {
            // An approved extension raced this firing; resync and wait.
            self.register_assignment(row.pet_id, caretaker.end_date, now)
                .await?;
            return Ok(false);
        }

        let stage = row.stage().ok_or_else(|| {
            EngineError::InvalidTransition(format!("unknown schedule stage {}", row.next_stage))
        })?;
        tracing::info!(pet_id = %pet.id, stage = stage.as_str(), "Firing care schedule stage");
        crate::metrics::scheduler_stage_fired(stage.as_str());

        match stage {
            Stage::Warning3 | Stage::Warning2 | Stage::Warning1 => {
                let days = stage.days_before_end().unwrap_or(1);
                let plural = if days == 1 { "day" } else { "days" };
                self.notify(
                    NewNotification::new(
                        pet.owner_id,
                        kinds::CARE_REMINDER,
                        format!(
                            "Temporary care for {} ends in {} {}.",
                            pet.name, days, plural
                        ),
                    )
                    .link(format!("/pets/{}", pet.id))
                    .pet(pet.id),
                    now,
                )
                .await;
                self.advance_warning(row, stage, now).await?;
            }
            Stage::LastDay => {
                for recipient in [pet.owner_id, caretaker.caretaker_id] {
                    self.notify(
                        NewNotification::new(
                            recipient,
                            kinds::CARE_REMINDER,
                            format!("Today is the last day of temporary care for {}.", pet.name),
                        )
                        .link(format!("/pets/{}", pet.id))
                        .pet(pet.id),
                        now,
                    )
                    .await;
                }
                let mut next = row.clone();
                next.next_stage = Stage::Expiry.as_str().to_string();
                next.next_wake_at = row.end_date + Duration::hours(1);
                next.updated_at = now;
                self.store.upsert_schedule(next).await?;
            }
            Stage::Expiry => {
                self.expire(&pet, now).await?;
            }
        }
        Ok(true)
    }

    async fn advance_warning(
        &self,
        row: &care_schedule::Model,
        fired: Stage,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let (mut stage, mut wake) = first_stage(row.end_date, now);
        if stage == fired {
            // Guarantee progress even when fired exactly on the boundary.
            (stage, wake) = match fired {
                Stage::Warning3 => (Stage::Warning2, row.end_date - Duration::days(2)),
                Stage::Warning2 => (Stage::Warning1, row.end_date - Duration::days(1)),
                _ => (Stage::LastDay, row.end_date),
            };
        }
        let mut next = row.clone();
        next.next_stage = stage.as_str().to_string();
        next.next_wake_at = wake;
        next.updated_at = now;
        self.store.upsert_schedule(next).await
    }

    /// Hard expiration: wording depends on whether the most recent extension
    /// request was rejected, then the terminal transition plus owner and
    /// caretaker notices. A second firing finds no active assignment and
    /// cleans up silently.
    async fn expire(&self, pet: &crate::entities::pet::Model, now: NaiveDateTime) -> Result<(), EngineError> {
        let last_rejected = pet
            .extensions()
            .last()
            .map(|r| r.status == ExtensionStatus::Rejected)
            .unwrap_or(false);

        let ended = match self
            .care
            .end_assignment(pet.id, EndReason::NaturalExpiry, now)
            .await
        {
            Ok(ended) => ended,
            Err(EngineError::InvalidTransition(_)) => {
                // Already ended by a concurrent firing or an owner action.
                self.store.delete_schedule(pet.id).await.map_err(EngineError::from)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let owner_message = if last_rejected {
            format!(
                "The extension for {} was declined and the care period has now ended. \
                 You can relist {} for adoption or find a vet near you.",
                ended.pet.name, ended.pet.name
            )
        } else {
            format!(
                "The temporary care period for {} has ended. \
                 You can relist {} for adoption or find a vet near you.",
                ended.pet.name, ended.pet.name
            )
        };
        self.notify(
            NewNotification::new(ended.pet.owner_id, kinds::CARE_EXPIRED, owner_message)
                .link(format!("/pets/{}", ended.pet.id))
                .pet(ended.pet.id),
            now,
        )
        .await;
        self.notify(
            NewNotification::new(
                ended.caretaker.caretaker_id,
                kinds::CARE_EXPIRED,
                format!("Your temporary care period for {} has ended.", ended.pet.name),
            )
            .pet(ended.pet.id),
            now,
        )
        .await;
        Ok(())
    }

    async fn notify(&self, new: NewNotification, now: NaiveDateTime) {
        if let Err(e) = self.sink.create(new, now).await {
            tracing::error!("Failed to write scheduler notification: {}", e);
            crate::metrics::swallowed_failure("scheduler_notification");
        }
    }

    /// Poll loop driving due rows. Runs until Ctrl+C.
    pub async fn run_poll_loop(self: Arc<Self>, poll_secs: u64) {
        let mut interval = time::interval(std::time::Duration::from_secs(poll_secs));
        tracing::info!("Care schedule polling started (interval: {}s)", poll_secs);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now().naive_utc();
                    if let Err(e) = self.process_due(now).await {
                        tracing::error!("Schedule poll failed: {}", e);
                    }
                }
                _ = signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received. Stopping schedule polling.");
                    break;
                }
            }
        }
    }

    /// Fixed-time daily sweep loop. Runs until Ctrl+C.
    pub async fn run_sweep_loop(self: Arc<Self>, sweep_hour: u32) {
        let sweep_hour = sweep_hour.min(23);
        loop {
            let now = Utc::now().naive_utc();
            let today = now.date().and_hms_opt(sweep_hour, 0, 0).unwrap_or(now);
            let next = if today > now {
                today
            } else {
                today + Duration::days(1)
            };
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tracing::info!(
                "Next daily sweep at {} ({}h UTC)",
                next,
                next.hour()
            );
            tokio::select! {
                _ = time::sleep(wait) => {
                    let now = Utc::now().naive_utc();
                    if let Err(e) = self.run_daily_sweep(now).await {
                        tracing::error!("Daily sweep failed: {}", e);
                    }
                }
                _ = signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received. Stopping daily sweep.");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::pet::{
        AdoptionStatus, CaretakerStatus, TemporaryCaretaker,
    };
    use crate::entities::{pet, user};
    use crate::notify::LocalLiveRegistry;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        care: Arc<CareService>,
        scheduler: ExpirationScheduler,
        sink: Arc<NotificationSink>,
    }

    fn fixture() -> Fixture {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let sink = Arc::new(NotificationSink::new(
            store.clone(),
            Arc::new(LocalLiveRegistry::new()),
        ));
        let care = Arc::new(CareService::new(store.clone(), sink.clone()));
        let scheduler = ExpirationScheduler::new(store.clone(), care.clone(), sink.clone());
        Fixture {
            store,
            care,
            scheduler,
            sink,
        }
    }

    async fn seed_pet(store: &MemoryStore, owner_id: Uuid, now: NaiveDateTime) -> pet::Model {
        let owner = user::Model {
            id: owner_id,
            name: "Lina".to_string(),
            city: "Gaza".to_string(),
            village: None,
            created_at: now,
        };
        store.insert_user(owner).await.unwrap();
        let p = pet::Model {
            id: Uuid::new_v4(),
            owner_id,
            name: "Rex".to_string(),
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

    #[test]
    fn first_stage_picks_each_warning_window() {
        let end = at(10, 12);
        assert_eq!(first_stage(end, at(1, 12)).0, Stage::Warning3);
        assert_eq!(first_stage(end, at(7, 13)).0, Stage::Warning2);
        assert_eq!(first_stage(end, at(8, 13)).0, Stage::Warning1);
        assert_eq!(first_stage(end, at(9, 13)).0, Stage::LastDay);
        assert_eq!(first_stage(end, at(10, 13)).0, Stage::Expiry);
    }

    #[test]
    fn first_stage_warning_wakes_days_before_end() {
        let end = at(10, 12);
        let (stage, wake) = first_stage(end, at(1, 12));
        assert_eq!(stage, Stage::Warning3);
        assert_eq!(wake, at(7, 12));
    }

    #[tokio::test]
    async fn expired_registration_fires_immediately_on_next_poll() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let now = at(5, 12);
        let p = seed_pet(&f.store, owner, now).await;
        f.care
            .begin_temporary_care(p.id, Uuid::new_v4(), at(1, 12), at(5, 11), now)
            .await
            .unwrap();

        let fired = f.scheduler.process_due(now).await.unwrap();
        assert_eq!(fired, 1);

        let pet = f.store.pet(p.id).await.unwrap().unwrap();
        assert_eq!(pet.adoption(), Some(AdoptionStatus::NotAvailable));
        assert!(pet.temporary_caretaker().is_none());
        assert!(f.store.schedule_for_pet(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn warning_fires_once_and_advances() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let begin = at(1, 12);
        let p = seed_pet(&f.store, owner, begin).await;
        f.care
            .begin_temporary_care(p.id, Uuid::new_v4(), begin, at(10, 12), begin)
            .await
            .unwrap();

        // Nothing due before the 3-day mark.
        assert_eq!(f.scheduler.process_due(at(6, 12)).await.unwrap(), 0);

        let warn_time = at(7, 13);
        assert_eq!(f.scheduler.process_due(warn_time).await.unwrap(), 1);
        // Same instant again: the row advanced, nothing re-fires.
        assert_eq!(f.scheduler.process_due(warn_time).await.unwrap(), 0);

        let reminders: Vec<_> = f
            .sink
            .user_notifications(owner)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == kinds::CARE_REMINDER)
            .collect();
        assert_eq!(reminders.len(), 1);
        assert!(reminders[0].message.contains("3 days"));

        let row = f.store.schedule_for_pet(p.id).await.unwrap().unwrap();
        assert_eq!(row.stage(), Some(Stage::Warning2));
    }

    #[tokio::test]
    async fn stale_row_for_ended_assignment_is_deleted_silently() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let now = at(1, 12);
        let p = seed_pet(&f.store, owner, now).await;
        // Row with no matching assignment at all.
        f.store
            .upsert_schedule(schedule_row(p.id, at(2, 12), now))
            .await
            .unwrap();

        let fired = f.scheduler.process_due(at(3, 12)).await.unwrap();
        assert_eq!(fired, 0);
        assert!(f.store.schedule_for_pet(p.id).await.unwrap().is_none());
        assert!(f.sink.user_notifications(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drifted_row_resyncs_to_extended_end_date() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let now = at(1, 12);
        let mut p = seed_pet(&f.store, owner, now).await;
        p.set_caretaker(Some(TemporaryCaretaker {
            caretaker_id: Uuid::new_v4(),
            start_date: now,
            end_date: at(20, 12),
            status: CaretakerStatus::Active,
        }));
        p.set_adoption(AdoptionStatus::TemporarilyAdopted);
        f.store.insert_pet(p.clone()).await.unwrap();
        // Row still carries the pre-extension end date and is overdue.
        f.store
            .upsert_schedule(schedule_row(p.id, at(2, 12), now))
            .await
            .unwrap();

        assert_eq!(f.scheduler.process_due(at(3, 12)).await.unwrap(), 0);
        let row = f.store.schedule_for_pet(p.id).await.unwrap().unwrap();
        assert_eq!(row.end_date, at(20, 12));
    }

    #[tokio::test]
    async fn duplicate_expiry_firing_is_a_noop() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let begin = at(1, 12);
        let p = seed_pet(&f.store, owner, begin).await;
        f.care
            .begin_temporary_care(p.id, Uuid::new_v4(), begin, at(2, 12), begin)
            .await
            .unwrap();

        let after_end = at(2, 14);
        // LastDay then Expiry.
        f.scheduler.process_due(at(2, 12)).await.unwrap();
        f.scheduler.process_due(after_end).await.unwrap();

        let expiry_notices = |list: &[crate::entities::notification::Model]| {
            list.iter().filter(|n| n.kind == kinds::CARE_EXPIRED).count()
        };
        let first = f.sink.user_notifications(owner).await.unwrap();
        assert_eq!(expiry_notices(&first), 1);

        // Sweep re-delivers the row as if a restart lost the timer.
        f.store
            .upsert_schedule(schedule_row(p.id, at(2, 12), after_end))
            .await
            .unwrap();
        f.scheduler.process_due(at(2, 15)).await.unwrap();

        let second = f.sink.user_notifications(owner).await.unwrap();
        assert_eq!(expiry_notices(&second), 1);
        let pet = f.store.pet(p.id).await.unwrap().unwrap();
        assert_eq!(pet.adoption(), Some(AdoptionStatus::NotAvailable));
    }

    #[tokio::test]
    async fn sweep_reregisters_missing_row() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let begin = at(1, 12);
        let p = seed_pet(&f.store, owner, begin).await;
        f.care
            .begin_temporary_care(p.id, Uuid::new_v4(), begin, at(10, 12), begin)
            .await
            .unwrap();
        // Simulate the row being lost.
        f.store.delete_schedule(p.id).await.unwrap();

        f.scheduler.run_daily_sweep(at(2, 9)).await.unwrap();

        let row = f.store.schedule_for_pet(p.id).await.unwrap().unwrap();
        assert_eq!(row.end_date, at(10, 12));
        assert_eq!(row.stage(), Some(Stage::Warning3));
    }

    #[tokio::test]
    async fn rejected_extension_changes_expiry_wording() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let begin = at(1, 12);
        let p = seed_pet(&f.store, owner, begin).await;
        f.care
            .begin_temporary_care(p.id, Uuid::new_v4(), begin, at(2, 12), begin)
            .await
            .unwrap();
        let request = f
            .care
            .request_extension(p.id, at(6, 12), begin)
            .await
            .unwrap();
        f.care
            .respond_to_extension(p.id, request.id, false, at(1, 13))
            .await
            .unwrap();

        f.scheduler.process_due(at(2, 12)).await.unwrap();
        f.scheduler.process_due(at(2, 14)).await.unwrap();

        let expired: Vec<_> = f
            .sink
            .user_notifications(owner)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == kinds::CARE_EXPIRED)
            .collect();
        assert_eq!(expired.len(), 1);
        assert!(expired[0].message.contains("declined"));
    }
}
