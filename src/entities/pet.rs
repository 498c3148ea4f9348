use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pet aggregate. The temporary caretaker and the extension-request history
/// are embedded JSON values, so a care transition is a whole-document
/// read-modify-write guarded by the `version` column.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
    pub adoption_status: String,
    #[sea_orm(nullable)]
    pub caretaker: Option<Json>,
    pub extension_requests: Json,
    pub version: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdoptionStatus {
    Available,
    NotAvailable,
    Adopted,
    TemporarilyAdopted,
}

impl AdoptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionStatus::Available => "available",
            AdoptionStatus::NotAvailable => "notAvailable",
            AdoptionStatus::Adopted => "adopted",
            AdoptionStatus::TemporarilyAdopted => "temporarilyAdopted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AdoptionStatus::Available),
            "notAvailable" => Some(AdoptionStatus::NotAvailable),
            "adopted" => Some(AdoptionStatus::Adopted),
            "temporarilyAdopted" => Some(AdoptionStatus::TemporarilyAdopted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaretakerStatus {
    Pending,
    Active,
    Completed,
    Canceled,
}

impl CaretakerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaretakerStatus::Completed | CaretakerStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Embedded caretaker assignment. At most one non-terminal assignment exists
/// per pet; a finished assignment is removed from the document entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryCaretaker {
    pub caretaker_id: Uuid,
    pub start_date: chrono::NaiveDateTime,
    pub end_date: chrono::NaiveDateTime,
    pub status: CaretakerStatus,
}

/// One entry of the append-only extension history. Entries never leave a
/// terminal status and are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub id: Uuid,
    pub caretaker_id: Uuid,
    pub status: ExtensionStatus,
    pub requested_end_date: chrono::NaiveDateTime,
    pub requested_at: chrono::NaiveDateTime,
    pub responded_at: Option<chrono::NaiveDateTime>,
}

impl Model {
    pub fn adoption(&self) -> Option<AdoptionStatus> {
        AdoptionStatus::parse(&self.adoption_status)
    }

    pub fn temporary_caretaker(&self) -> Option<TemporaryCaretaker> {
        self.caretaker
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The caretaker assignment, if it is currently active.
    pub fn active_caretaker(&self) -> Option<TemporaryCaretaker> {
        self.temporary_caretaker()
            .filter(|c| c.status == CaretakerStatus::Active)
    }

    pub fn extensions(&self) -> Vec<ExtensionRequest> {
        serde_json::from_value(self.extension_requests.clone()).unwrap_or_default()
    }

    pub fn set_caretaker(&mut self, caretaker: Option<TemporaryCaretaker>) {
        self.caretaker =
            caretaker.map(|c| serde_json::to_value(c).unwrap_or(serde_json::json!(null)));
    }

    pub fn set_extensions(&mut self, requests: Vec<ExtensionRequest>) {
        self.extension_requests =
            serde_json::to_value(requests).unwrap_or(serde_json::json!([]));
    }

    pub fn set_adoption(&mut self, status: AdoptionStatus) {
        self.adoption_status = status.as_str().to_string();
    }
}
