use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Geographically scoped outbreak alert. Regions, recommendations and the
/// contributing detection ids live in JSON columns.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "outbreak_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub disease: String,
    pub species: String,
    pub regions: Json,
    pub case_count: i32,
    pub avg_confidence: f64,
    pub severity: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub recommendations: Json,
    pub detection_ids: Json,
    pub is_active: bool,
    pub started_at: DateTime,
    #[sea_orm(nullable)]
    pub ended_at: Option<DateTime>,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Unit of geographic matching: a city plus an optional village. An empty
/// village string is normalized to absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub city: String,
    pub village: Option<String>,
}

impl Region {
    pub fn new(city: impl Into<String>, village: Option<String>) -> Self {
        Region {
            city: city.into(),
            village: village.filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn label(&self) -> String {
        match &self.village {
            Some(village) => format!("{}, {}", village, self.city),
            None => self.city.clone(),
        }
    }

    /// Strict locality match: same city, and villages equal or both absent.
    /// Used for clustering candidates and alert dedup.
    pub fn same_locality(&self, other: &Region) -> bool {
        self.city == other.city && self.village == other.village
    }

    /// Recipient match: a region without a village covers every village of
    /// the city; a region with one only covers that village.
    pub fn covers(&self, other: &Region) -> bool {
        self.city == other.city
            && match &self.village {
                Some(village) => other.village.as_deref() == Some(village.as_str()),
                None => true,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl Model {
    pub fn regions(&self) -> Vec<Region> {
        serde_json::from_value(self.regions.clone()).unwrap_or_default()
    }

    pub fn detection_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.detection_ids.clone()).unwrap_or_default()
    }

    pub fn set_detection_ids(&mut self, ids: Vec<Uuid>) {
        self.detection_ids = serde_json::to_value(ids).unwrap_or(serde_json::json!([]));
    }
}
