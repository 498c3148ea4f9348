use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::outbreak_alert::Region;

/// Minimal account projection the engine needs: identity plus the location
/// fields outbreak matching runs on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub city: String,
    #[sea_orm(nullable)]
    pub village: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn region(&self) -> Region {
        Region::new(self.city.clone(), self.village.clone())
    }
}
