use crate::{
    db::DbPool,
    entities::product_inventory::{
        self, ActiveModel as InventoryActiveModel, Entity as InventoryEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetInventoryLevelRequest {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    #[schema(value_type = f64)]
    pub on_hand: Decimal,
    #[schema(value_type = Option<f64>)]
    pub cost: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevelResponse {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    #[schema(value_type = f64)]
    pub on_hand: Decimal,
    #[schema(value_type = f64)]
    pub cost: Decimal,
}

impl From<product_inventory::Model> for InventoryLevelResponse {
    fn from(model: product_inventory::Model) -> Self {
        Self {
            product_id: model.product_id,
            branch_id: model.branch_id,
            on_hand: model.on_hand,
            cost: model.cost,
        }
    }
}

/// Per-branch stock level service. The transfer service goes through the
/// associated functions so stock movement joins its transaction.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Fetches the stock row for a product at a branch, if one exists.
    pub async fn level<C: ConnectionTrait>(
        db: &C,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<product_inventory::Model>, ServiceError> {
        InventoryEntity::find()
            .filter(product_inventory::Column::ProductId.eq(product_id))
            .filter(product_inventory::Column::BranchId.eq(branch_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Applies a signed stock delta. Debits fail with `InsufficientStock`
    /// when the live balance does not cover them; credits create the stock
    /// row on first receipt. Returns the new on-hand quantity.
    pub async fn apply_delta<C: ConnectionTrait>(
        db: &C,
        product_id: Uuid,
        branch_id: Uuid,
        delta: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let existing = Self::level(db, product_id, branch_id).await?;

        match existing {
            Some(row) => {
                let new_on_hand = row.on_hand + delta;
                if new_on_hand < Decimal::ZERO {
                    return Err(ServiceError::InsufficientStock(format!(
                        "product {} at branch {}: on hand {}, requested {}",
                        product_id,
                        branch_id,
                        row.on_hand,
                        delta.abs()
                    )));
                }
                let mut active = row.into_active_model();
                active.on_hand = Set(new_on_hand);
                active.updated_at = Set(Some(Utc::now()));
                active.update(db).await?;
                Ok(new_on_hand)
            }
            None => {
                if delta < Decimal::ZERO {
                    return Err(ServiceError::InsufficientStock(format!(
                        "product {} has no stock at branch {}",
                        product_id, branch_id
                    )));
                }
                let active = InventoryActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    branch_id: Set(branch_id),
                    on_hand: Set(delta),
                    cost: Set(Decimal::ZERO),
                    updated_at: Set(Some(Utc::now())),
                };
                active.insert(db).await?;
                Ok(delta)
            }
        }
    }

    /// Gets the stock level for a product at a branch.
    #[instrument(skip(self))]
    pub async fn get_level(
        &self,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> Result<InventoryLevelResponse, ServiceError> {
        let db = &*self.db_pool;

        Self::level(db, product_id, branch_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No inventory for product {} at branch {}",
                    product_id, branch_id
                ))
            })
    }

    /// Sets (upserts) the absolute stock level and optionally the unit cost
    /// for a product at a branch.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, branch_id = %request.branch_id))]
    pub async fn set_level(
        &self,
        request: SetInventoryLevelRequest,
    ) -> Result<InventoryLevelResponse, ServiceError> {
        if request.on_hand < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "onHand must not be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let existing = Self::level(db, request.product_id, request.branch_id).await?;

        let (old_on_hand, updated) = match existing {
            Some(row) => {
                let old = row.on_hand;
                let cost = request.cost.unwrap_or(row.cost);
                let mut active = row.into_active_model();
                active.on_hand = Set(request.on_hand);
                active.cost = Set(cost);
                active.updated_at = Set(Some(Utc::now()));
                (old, active.update(db).await?)
            }
            None => {
                let active = InventoryActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(request.product_id),
                    branch_id: Set(request.branch_id),
                    on_hand: Set(request.on_hand),
                    cost: Set(request.cost.unwrap_or(Decimal::ZERO)),
                    updated_at: Set(Some(Utc::now())),
                };
                (Decimal::ZERO, active.insert(db).await?)
            }
        };

        let event = Event::InventoryLevelSet {
            product_id: updated.product_id,
            branch_id: updated.branch_id,
            old_on_hand,
            new_on_hand: updated.on_hand,
        };
        if let Err(e) = self.event_sender.send(event).await {
            error!(error = %e, "Failed to publish inventory level event");
        }

        Ok(updated.into())
    }
}
