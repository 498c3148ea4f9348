//! Full-lifecycle scenarios running the engine services against the in-memory
//! store: a temporary-care assignment driven through warnings to hard
//! expiration by the daily sweep, and a detection burst turning into an
//! outbreak alert with fan-out.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use furever_engine::care::CareService;
use furever_engine::entities::detection_event;
use furever_engine::entities::pet::{self, AdoptionStatus};
use furever_engine::entities::user;
use furever_engine::notify::{kinds, LocalLiveRegistry, NotificationSink};
use furever_engine::outbreak::{DetectionOutcome, OutbreakPipeline};
use furever_engine::scheduler::ExpirationScheduler;
use furever_engine::store::{EngineStore, MemoryStore};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

struct Harness {
    store: Arc<MemoryStore>,
    sink: Arc<NotificationSink>,
    care: Arc<CareService>,
    scheduler: ExpirationScheduler,
    pipeline: OutbreakPipeline,
}

fn harness() -> Harness {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let sink = Arc::new(NotificationSink::new(
        store.clone(),
        Arc::new(LocalLiveRegistry::new()),
    ));
    let care = Arc::new(CareService::new(store.clone(), sink.clone()));
    let scheduler = ExpirationScheduler::new(store.clone(), care.clone(), sink.clone());
    let pipeline = OutbreakPipeline::new(store.clone(), sink.clone());
    Harness {
        store,
        sink,
        care,
        scheduler,
        pipeline,
    }
}

async fn seed_owner_and_pet(
    store: &MemoryStore,
    city: &str,
    village: Option<&str>,
    species: &str,
    now: NaiveDateTime,
) -> pet::Model {
    let owner_id = Uuid::new_v4();
    store
        .insert_user(user::Model {
            id: owner_id,
            name: format!("owner-{}", &owner_id.to_string()[..8]),
            city: city.to_string(),
            village: village.map(str::to_string),
            created_at: now,
        })
        .await
        .unwrap();
    let p = pet::Model {
        id: Uuid::new_v4(),
        owner_id,
        name: "Pasha".to_string(),
        species: species.to_string(),
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
async fn assignment_walks_through_warnings_to_expiry() {
    let h = harness();
    let start = at(1, 12);
    let end = at(11, 12);
    let pet = seed_owner_and_pet(&h.store, "Jaffa", None, "dog", start).await;
    let caretaker_id = Uuid::new_v4();

    h.care
        .begin_temporary_care(pet.id, caretaker_id, start, end, start)
        .await
        .unwrap();

    // Nothing due before the three-day mark.
    assert_eq!(h.scheduler.run_daily_sweep(at(5, 13)).await.unwrap(), 0);

    // Three, two and one days before the end, one owner reminder each.
    assert_eq!(h.scheduler.run_daily_sweep(at(8, 13)).await.unwrap(), 1);
    assert_eq!(h.scheduler.run_daily_sweep(at(9, 13)).await.unwrap(), 1);
    assert_eq!(h.scheduler.run_daily_sweep(at(10, 13)).await.unwrap(), 1);

    let owner_box = h.sink.user_notifications(pet.owner_id).await.unwrap();
    let reminders: Vec<_> = owner_box
        .iter()
        .filter(|n| n.kind == kinds::CARE_REMINDER)
        .collect();
    assert_eq!(reminders.len(), 3);
    // Newest first.
    assert!(reminders[0].message.contains("1 day"));
    assert!(reminders[1].message.contains("2 days"));
    assert!(reminders[2].message.contains("3 days"));

    // The end date itself: last-day notice to both parties, not yet expired.
    assert_eq!(h.scheduler.run_daily_sweep(at(11, 12)).await.unwrap(), 1);
    let still = h.store.pet(pet.id).await.unwrap().unwrap();
    assert!(still.active_caretaker().is_some());
    let caretaker_box = h.sink.user_notifications(caretaker_id).await.unwrap();
    assert!(caretaker_box
        .iter()
        .any(|n| n.message.contains("last day")));

    // One hour past the end the assignment hard-expires.
    assert_eq!(h.scheduler.process_due(at(11, 14)).await.unwrap(), 1);
    let expired = h.store.pet(pet.id).await.unwrap().unwrap();
    assert_eq!(expired.adoption(), Some(AdoptionStatus::NotAvailable));
    assert!(expired.temporary_caretaker().is_none());
    assert!(h.store.schedule_for_pet(pet.id).await.unwrap().is_none());

    let owner_box = h.sink.user_notifications(pet.owner_id).await.unwrap();
    assert!(owner_box
        .iter()
        .any(|n| n.kind == kinds::CARE_EXPIRED && n.message.contains("relist")));
    let caretaker_box = h.sink.user_notifications(caretaker_id).await.unwrap();
    assert!(caretaker_box
        .iter()
        .any(|n| n.kind == kinds::CARE_EXPIRED));

    // A later sweep has nothing left to fire.
    assert_eq!(h.scheduler.run_daily_sweep(at(12, 13)).await.unwrap(), 0);
}

#[tokio::test]
async fn approved_extension_pushes_expiry_back() {
    let h = harness();
    let start = at(1, 12);
    let pet = seed_owner_and_pet(&h.store, "Jaffa", None, "dog", start).await;

    h.care
        .begin_temporary_care(pet.id, Uuid::new_v4(), start, at(5, 12), start)
        .await
        .unwrap();
    let request = h
        .care
        .request_extension(pet.id, at(20, 12), at(2, 12))
        .await
        .unwrap();
    h.care
        .respond_to_extension(pet.id, request.id, true, at(3, 12))
        .await
        .unwrap();

    // The old expiry moment passes without effect.
    h.scheduler.run_daily_sweep(at(5, 14)).await.unwrap();
    let still = h.store.pet(pet.id).await.unwrap().unwrap();
    assert!(still.active_caretaker().is_some());

    h.scheduler.run_daily_sweep(at(20, 12)).await.unwrap();
    h.scheduler.process_due(at(20, 14)).await.unwrap();
    let expired = h.store.pet(pet.id).await.unwrap().unwrap();
    assert!(expired.active_caretaker().is_none());
}

#[tokio::test]
async fn detection_burst_raises_alert_and_notifies_the_city() {
    let h = harness();
    let now = at(1, 10);

    let sick = [
        seed_owner_and_pet(&h.store, "Jaffa", None, "dog", now).await,
        seed_owner_and_pet(&h.store, "Jaffa", None, "dog", now).await,
        seed_owner_and_pet(&h.store, "Jaffa", None, "dog", now).await,
    ];
    // Same city, different species: eligible for fan-out only via a dog.
    let cat_pet = seed_owner_and_pet(&h.store, "Jaffa", None, "cat", now).await;

    let mut outcome = DetectionOutcome::Ignored;
    for (i, pet) in sick.iter().enumerate() {
        let event = detection_event::Model {
            id: Uuid::new_v4(),
            pet_id: pet.id,
            owner_id: pet.owner_id,
            species: "dog".to_string(),
            prediction: "parvovirus".to_string(),
            confidence: 0.7,
            created_at: at(1, 10 + i as u32),
        };
        outcome = h.pipeline.ingest(event, at(1, 10 + i as u32)).await.unwrap();
    }

    let alert = match outcome {
        DetectionOutcome::AlertCreated(alert) => alert,
        other => panic!("expected an alert, got {:?}", other),
    };
    assert_eq!(alert.case_count, 3);
    assert_eq!(alert.severity, "medium");
    assert!(alert.is_active);

    // Every dog owner in the city got exactly one receipt and notification.
    for pet in &sick {
        let inbox = h.sink.user_notifications(pet.owner_id).await.unwrap();
        let alerts: Vec<_> = inbox
            .iter()
            .filter(|n| n.kind == kinds::OUTBREAK_ALERT)
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_id, Some(alert.id));
    }
    let cat_inbox = h.sink.user_notifications(cat_pet.owner_id).await.unwrap();
    assert!(cat_inbox.is_empty());

    // A fourth case folds into the alert without another round of messages.
    let extra = seed_owner_and_pet(&h.store, "Jaffa", None, "dog", now).await;
    let event = detection_event::Model {
        id: Uuid::new_v4(),
        pet_id: extra.id,
        owner_id: extra.owner_id,
        species: "dog".to_string(),
        prediction: "parvovirus".to_string(),
        confidence: 0.9,
        created_at: at(1, 15),
    };
    let outcome = h.pipeline.ingest(event, at(1, 15)).await.unwrap();
    assert!(matches!(outcome, DetectionOutcome::AlertUpdated(_)));
    for pet in &sick {
        let inbox = h.sink.user_notifications(pet.owner_id).await.unwrap();
        let alerts = inbox
            .iter()
            .filter(|n| n.kind == kinds::OUTBREAK_ALERT)
            .count();
        assert_eq!(alerts, 1);
    }

    let active = h.store.all_active_alerts().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].case_count, 4);
}
