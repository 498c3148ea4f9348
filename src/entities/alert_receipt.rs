use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-(user, alert) delivery and read-state record. Created exactly once per
/// recipient per alert by fan-out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "alert_receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_kind: String,
    pub alert_id: Uuid,
    pub read: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Typed reference to the alert a receipt points at. The discriminator and
/// the id travel together; storage splits them into (alert_kind, alert_id).
/// Today outbreak alerts are the only kind, but the enum is where a future
/// alert family plugs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertRef {
    Outbreak(Uuid),
}

impl AlertRef {
    pub fn kind(&self) -> &'static str {
        match self {
            AlertRef::Outbreak(_) => "outbreak",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AlertRef::Outbreak(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "outbreak" => Some(AlertRef::Outbreak(id)),
            _ => None,
        }
    }
}

impl Model {
    pub fn alert_ref(&self) -> Option<AlertRef> {
        AlertRef::from_parts(&self.alert_kind, self.alert_id)
    }
}
