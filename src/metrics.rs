use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{notification, outbreak_alert, pet, user};

/// Seed the standing gauges from current table counts at startup.
pub async fn init_metrics(db: &DatabaseConnection) {
    let pet_count = pet::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("furever_pets_total").set(pet_count as f64);

    let user_count = user::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("furever_users_total").set(user_count as f64);

    let alert_count = outbreak_alert::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("furever_outbreak_alerts_total").set(alert_count as f64);

    let notification_count = notification::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("furever_notifications_total").set(notification_count as f64);

    tracing::info!(
        "Initialized metrics: Pets={}, Users={}, Alerts={}, Notifications={}",
        pet_count,
        user_count,
        alert_count,
        notification_count
    );
}

/// A side-effect failure that was logged and swallowed instead of failing the
/// primary request. Counted so silent data loss stays observable.
pub fn swallowed_failure(stage: &str) {
    metrics::counter!("furever_swallowed_failures_total", "stage" => stage.to_string())
        .increment(1);
}

pub fn notification_created(kind: &str) {
    metrics::counter!("furever_notifications_created_total", "kind" => kind.to_string())
        .increment(1);
}

pub fn live_push(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "skipped" };
    metrics::counter!("furever_live_push_total", "outcome" => outcome).increment(1);
}

pub fn outbreak_alert_created(severity: &str) {
    metrics::counter!("furever_outbreak_alerts_created_total", "severity" => severity.to_string())
        .increment(1);
}

pub fn outbreak_alert_updated() {
    metrics::counter!("furever_outbreak_alerts_updated_total").increment(1);
}

pub fn fanout_recipient(delivered: bool) {
    let outcome = if delivered { "notified" } else { "failed" };
    metrics::counter!("furever_fanout_recipients_total", "outcome" => outcome).increment(1);
}

pub fn scheduler_stage_fired(stage: &str) {
    metrics::counter!("furever_scheduler_stages_fired_total", "stage" => stage.to_string())
        .increment(1);
}

pub fn sweep_repaired_schedule() {
    metrics::counter!("furever_sweep_repaired_schedules_total").increment(1);
}
