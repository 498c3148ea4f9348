use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_pets;
mod m20260801_000003_create_detection_events;
mod m20260801_000004_create_outbreak_alerts;
mod m20260801_000005_create_alert_receipts;
mod m20260801_000006_create_notifications;
mod m20260801_000007_create_care_schedules;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_pets::Migration),
            Box::new(m20260801_000003_create_detection_events::Migration),
            Box::new(m20260801_000004_create_outbreak_alerts::Migration),
            Box::new(m20260801_000005_create_alert_receipts::Migration),
            Box::new(m20260801_000006_create_notifications::Migration),
            Box::new(m20260801_000007_create_care_schedules::Migration),
        ]
    }
}
