use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durable scheduler row: one per active caretaker assignment, holding the
/// next time-anchored event to fire. Canceling an assignment deletes the row;
/// an approved extension upserts it. No live timers to leak or go stale.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "care_schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pet_id: Uuid,
    pub end_date: DateTime,
    pub next_stage: String,
    pub next_wake_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Reminder stages in firing order: day-count warnings, the last-day notice
/// at the end date, then hard expiration one hour later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Warning3,
    Warning2,
    Warning1,
    LastDay,
    Expiry,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Warning3 => "warning3",
            Stage::Warning2 => "warning2",
            Stage::Warning1 => "warning1",
            Stage::LastDay => "lastDay",
            Stage::Expiry => "expiry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warning3" => Some(Stage::Warning3),
            "warning2" => Some(Stage::Warning2),
            "warning1" => Some(Stage::Warning1),
            "lastDay" => Some(Stage::LastDay),
            "expiry" => Some(Stage::Expiry),
            _ => None,
        }
    }

    /// Days before the end date a warning stage fires at. None for the
    /// non-warning stages.
    pub fn days_before_end(&self) -> Option<i64> {
        match self {
            Stage::Warning3 => Some(3),
            Stage::Warning2 => Some(2),
            Stage::Warning1 => Some(1),
            _ => None,
        }
    }
}

impl Model {
    pub fn stage(&self) -> Option<Stage> {
        Stage::parse(&self.next_stage)
    }
}
