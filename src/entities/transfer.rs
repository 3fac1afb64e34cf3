use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A stock-movement document between two branches. Status is stored as the
/// plain wire integer (1 = draft, 2 = in-transit, 3 = received,
/// 4 = cancelled); the typed enum and its transition table live in
/// `crate::models::TransferStatus` and are applied in the service layer
/// before any write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Transfer code must be between 1 and 50 characters"
    ))]
    pub code: String,

    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub status: i16,

    /// Free-text note owned by the sending branch.
    pub note_by_source: Option<String>,
    /// Free-text note owned by the receiving branch.
    pub note_by_destination: Option<String>,

    pub transfer_date: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_line::Entity")]
    TransferLines,
}

impl Related<super::transfer_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
