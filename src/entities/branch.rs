use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A store/warehouse location; the unit of inventory ownership.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Branch code must be between 1 and 50 characters"
    ))]
    pub code: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Branch name must be between 1 and 255 characters"
    ))]
    pub name: String,

    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_inventory::Entity")]
    ProductInventories,
}

impl Related<super::product_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductInventories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
