use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable product code (SKU).
    #[validate(length(
        min = 1,
        max = 100,
        message = "Product code must be between 1 and 100 characters"
    ))]
    pub code: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Selling unit, e.g. "kg", "pcs".
    pub unit: Option<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_inventory::Entity")]
    ProductInventories,
    #[sea_orm(has_many = "super::transfer_line::Entity")]
    TransferLines,
}

impl Related<super::product_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductInventories.def()
    }
}

impl Related<super::transfer_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
