use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durable per-user message record. Terminal sink entity: nothing mutates a
/// notification after creation except the read flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(nullable)]
    pub link: Option<String>,
    pub kind: String,
    #[sea_orm(nullable)]
    pub severity: Option<String>,
    #[sea_orm(nullable)]
    pub pet_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub alert_id: Option<Uuid>,
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
