//! sea-orm backed `EngineStore` over Postgres.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::pet::AdoptionStatus;
use crate::entities::{
    alert_receipt, care_schedule, detection_event, notification, outbreak_alert, pet, user,
};
use crate::error::StoreError;

use super::EngineStore;

pub struct OrmStore {
    db: DatabaseConnection,
}

impl OrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EngineStore for OrmStore {
    async fn pet(&self, id: Uuid) -> Result<Option<pet::Model>, StoreError> {
        Ok(pet::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_pet(&self, p: pet::Model) -> Result<(), StoreError> {
        let active = pet::ActiveModel {
            id: Set(p.id),
            owner_id: Set(p.owner_id),
            name: Set(p.name),
            species: Set(p.species),
            adoption_status: Set(p.adoption_status),
            caretaker: Set(p.caretaker),
            extension_requests: Set(p.extension_requests),
            version: Set(p.version),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn save_pet(&self, mut p: pet::Model) -> Result<pet::Model, StoreError> {
        // Conditional update on the version column: the whole document is
        // written back only if nobody else won the race first.
        let expected = p.version;
        let result = pet::Entity::update_many()
            .filter(pet::Column::Id.eq(p.id))
            .filter(pet::Column::Version.eq(expected))
            .col_expr(pet::Column::AdoptionStatus, Expr::value(p.adoption_status.clone()))
            .col_expr(pet::Column::Caretaker, Expr::value(p.caretaker.clone()))
            .col_expr(
                pet::Column::ExtensionRequests,
                Expr::value(p.extension_requests.clone()),
            )
            .col_expr(pet::Column::Version, Expr::value(expected + 1))
            .col_expr(pet::Column::UpdatedAt, Expr::value(p.updated_at))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return match pet::Entity::find_by_id(p.id).one(&self.db).await? {
                Some(_) => Err(StoreError::VersionConflict),
                None => Err(StoreError::NotFound),
            };
        }
        p.version = expected + 1;
        Ok(p)
    }

    async fn pets_owned_by(&self, owner_id: Uuid) -> Result<Vec<pet::Model>, StoreError> {
        Ok(pet::Entity::find()
            .filter(pet::Column::OwnerId.eq(owner_id))
            .all(&self.db)
            .await?)
    }

    async fn pets_in_temporary_care(&self) -> Result<Vec<pet::Model>, StoreError> {
        // An active assignment always coincides with temporarilyAdopted.
        Ok(pet::Entity::find()
            .filter(pet::Column::AdoptionStatus.eq(AdoptionStatus::TemporarilyAdopted.as_str()))
            .all(&self.db)
            .await?)
    }

    async fn user(&self, id: Uuid) -> Result<Option<user::Model>, StoreError> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_user(&self, u: user::Model) -> Result<(), StoreError> {
        let active = user::ActiveModel {
            id: Set(u.id),
            name: Set(u.name),
            city: Set(u.city),
            village: Set(u.village),
            created_at: Set(u.created_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn users_in_city(&self, city: &str) -> Result<Vec<user::Model>, StoreError> {
        Ok(user::Entity::find()
            .filter(user::Column::City.eq(city))
            .all(&self.db)
            .await?)
    }

    async fn insert_detection(&self, d: detection_event::Model) -> Result<(), StoreError> {
        let active = detection_event::ActiveModel {
            id: Set(d.id),
            pet_id: Set(d.pet_id),
            owner_id: Set(d.owner_id),
            species: Set(d.species),
            prediction: Set(d.prediction),
            confidence: Set(d.confidence),
            created_at: Set(d.created_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn detections_matching(
        &self,
        species: &str,
        prediction: &str,
        min_confidence: f64,
        since: NaiveDateTime,
    ) -> Result<Vec<detection_event::Model>, StoreError> {
        Ok(detection_event::Entity::find()
            .filter(detection_event::Column::Species.eq(species))
            .filter(detection_event::Column::Prediction.eq(prediction))
            .filter(detection_event::Column::Confidence.gt(min_confidence))
            .filter(detection_event::Column::CreatedAt.gte(since))
            .all(&self.db)
            .await?)
    }

    async fn alert(&self, id: Uuid) -> Result<Option<outbreak_alert::Model>, StoreError> {
        Ok(outbreak_alert::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_alert(&self, a: outbreak_alert::Model) -> Result<(), StoreError> {
        let active = outbreak_alert::ActiveModel {
            id: Set(a.id),
            disease: Set(a.disease),
            species: Set(a.species),
            regions: Set(a.regions),
            case_count: Set(a.case_count),
            avg_confidence: Set(a.avg_confidence),
            severity: Set(a.severity),
            message: Set(a.message),
            recommendations: Set(a.recommendations),
            detection_ids: Set(a.detection_ids),
            is_active: Set(a.is_active),
            started_at: Set(a.started_at),
            ended_at: Set(a.ended_at),
            updated_at: Set(a.updated_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn update_alert(&self, a: outbreak_alert::Model) -> Result<(), StoreError> {
        let existing = outbreak_alert::Entity::find_by_id(a.id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: outbreak_alert::ActiveModel = existing.into();
        active.case_count = Set(a.case_count);
        active.avg_confidence = Set(a.avg_confidence);
        active.severity = Set(a.severity);
        active.regions = Set(a.regions);
        active.detection_ids = Set(a.detection_ids);
        active.is_active = Set(a.is_active);
        active.ended_at = Set(a.ended_at);
        active.updated_at = Set(a.updated_at);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn active_alerts(
        &self,
        disease: &str,
        species: &str,
    ) -> Result<Vec<outbreak_alert::Model>, StoreError> {
        Ok(outbreak_alert::Entity::find()
            .filter(outbreak_alert::Column::IsActive.eq(true))
            .filter(outbreak_alert::Column::Disease.eq(disease))
            .filter(outbreak_alert::Column::Species.eq(species))
            .all(&self.db)
            .await?)
    }

    async fn all_active_alerts(&self) -> Result<Vec<outbreak_alert::Model>, StoreError> {
        Ok(outbreak_alert::Entity::find()
            .filter(outbreak_alert::Column::IsActive.eq(true))
            .order_by_desc(outbreak_alert::Column::StartedAt)
            .all(&self.db)
            .await?)
    }

    async fn insert_receipt(&self, r: alert_receipt::Model) -> Result<(), StoreError> {
        let active = alert_receipt::ActiveModel {
            id: Set(r.id),
            user_id: Set(r.user_id),
            alert_kind: Set(r.alert_kind),
            alert_id: Set(r.alert_id),
            read: Set(r.read),
            created_at: Set(r.created_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn receipt_exists(
        &self,
        user_id: Uuid,
        alert_kind: &str,
        alert_id: Uuid,
    ) -> Result<bool, StoreError> {
        let count = alert_receipt::Entity::find()
            .filter(alert_receipt::Column::UserId.eq(user_id))
            .filter(alert_receipt::Column::AlertKind.eq(alert_kind))
            .filter(alert_receipt::Column::AlertId.eq(alert_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn mark_receipt_read(&self, id: Uuid) -> Result<alert_receipt::Model, StoreError> {
        let receipt = alert_receipt::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: alert_receipt::ActiveModel = receipt.into();
        active.read = Set(true);
        Ok(active.update(&self.db).await?)
    }

    async fn insert_notification(&self, n: notification::Model) -> Result<(), StoreError> {
        let active = notification::ActiveModel {
            id: Set(n.id),
            user_id: Set(n.user_id),
            message: Set(n.message),
            link: Set(n.link),
            kind: Set(n.kind),
            severity: Set(n.severity),
            pet_id: Set(n.pet_id),
            alert_id: Set(n.alert_id),
            read: Set(n.read),
            created_at: Set(n.created_at),
        };
        active.insert(&self.db).await?;
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, StoreError> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
    ) -> Result<notification::Model, StoreError> {
        let n = notification::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: notification::ActiveModel = n.into();
        active.read = Set(true);
        Ok(active.update(&self.db).await?)
    }

    async fn upsert_schedule(&self, job: care_schedule::Model) -> Result<(), StoreError> {
        let existing = care_schedule::Entity::find_by_id(job.pet_id)
            .one(&self.db)
            .await?;
        match existing {
            Some(row) => {
                let mut active: care_schedule::ActiveModel = row.into();
                active.end_date = Set(job.end_date);
                active.next_stage = Set(job.next_stage);
                active.next_wake_at = Set(job.next_wake_at);
                active.updated_at = Set(job.updated_at);
                active.update(&self.db).await?;
            }
            None => {
                let active = care_schedule::ActiveModel {
                    pet_id: Set(job.pet_id),
                    end_date: Set(job.end_date),
                    next_stage: Set(job.next_stage),
                    next_wake_at: Set(job.next_wake_at),
                    created_at: Set(job.created_at),
                    updated_at: Set(job.updated_at),
                };
                active.insert(&self.db).await?;
            }
        }
        Ok(())
    }

    async fn schedule_for_pet(
        &self,
        pet_id: Uuid,
    ) -> Result<Option<care_schedule::Model>, StoreError> {
        Ok(care_schedule::Entity::find_by_id(pet_id).one(&self.db).await?)
    }

    async fn due_schedules(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<care_schedule::Model>, StoreError> {
        Ok(care_schedule::Entity::find()
            .filter(care_schedule::Column::NextWakeAt.lte(now))
            .all(&self.db)
            .await?)
    }

    async fn delete_schedule(&self, pet_id: Uuid) -> Result<(), StoreError> {
        care_schedule::Entity::delete_by_id(pet_id)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
