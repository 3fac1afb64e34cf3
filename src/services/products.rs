use crate::{
    db::DbPool,
    entities::{
        product::{self, ActiveModel as ProductActiveModel, Entity as ProductEntity},
        product_inventory::{self, Entity as InventoryEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::snapshots::ProductLookup;

const DEFAULT_SEARCH_LIMIT: u64 = 20;
const MAX_SEARCH_LIMIT: u64 = 100;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Product code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub unit: Option<String>,
}

/// Per-branch stock view nested under a product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInventoryView {
    pub branch_id: Uuid,
    #[schema(value_type = f64)]
    pub on_hand: Decimal,
    #[schema(value_type = f64)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithInventories {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
    pub is_active: bool,
    pub inventories: Vec<ProductInventoryView>,
}

impl ProductWithInventories {
    /// On-hand quantity at the given branch, if the product is stocked there.
    pub fn on_hand_at(&self, branch_id: Uuid) -> Option<Decimal> {
        self.inventories
            .iter()
            .find(|inv| inv.branch_id == branch_id)
            .map(|inv| inv.on_hand)
    }

    /// Unit cost at the given branch, if the product is stocked there.
    pub fn cost_at(&self, branch_id: Uuid) -> Option<Decimal> {
        self.inventories
            .iter()
            .find(|inv| inv.branch_id == branch_id)
            .map(|inv| inv.cost)
    }
}

/// Product catalog service. Search is scoped to branches so the transfer
/// form only offers products stocked on either side of the movement.
#[derive(Clone)]
pub struct ProductCatalogService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductCatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductWithInventories, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let existing = ProductEntity::find()
            .filter(product::Column::Code.eq(request.code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product code '{}' already exists",
                request.code
            )));
        }

        let product_id = Uuid::new_v4();
        let model = ProductActiveModel {
            id: Set(product_id),
            code: Set(request.code),
            name: Set(request.name),
            unit: Set(request.unit),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "Failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        if let Err(e) = self
            .event_sender
            .send(Event::ProductCreated(product_id))
            .await
        {
            error!(error = %e, "Failed to publish product created event");
        }

        Ok(ProductWithInventories {
            id: created.id,
            code: created.code,
            name: created.name,
            unit: created.unit,
            is_active: created.is_active,
            inventories: Vec::new(),
        })
    }

    /// Free-text search by code or name. When branch ids are given, only
    /// products stocked at any of those branches match.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        search: Option<String>,
        limit: Option<u64>,
        branch_ids: Vec<Uuid>,
    ) -> Result<Vec<ProductWithInventories>, ServiceError> {
        let db = &*self.db_pool;
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        let mut condition = Condition::all().add(product::Column::IsActive.eq(true));

        if let Some(term) = search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(product::Column::Code.contains(term))
                    .add(product::Column::Name.contains(term)),
            );
        }

        if !branch_ids.is_empty() {
            let stocked: Vec<Uuid> = InventoryEntity::find()
                .filter(product_inventory::Column::BranchId.is_in(branch_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|row| row.product_id)
                .collect();

            if stocked.is_empty() {
                return Ok(Vec::new());
            }
            condition = condition.add(product::Column::Id.is_in(stocked));
        }

        let products = ProductEntity::find()
            .filter(condition)
            .order_by_asc(product::Column::Code)
            .limit(limit)
            .all(db)
            .await?;

        let mut result = Vec::with_capacity(products.len());
        for model in products {
            result.push(self.attach_inventories(model).await?);
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn get_product(
        &self,
        product_id: Uuid,
    ) -> Result<ProductWithInventories, ServiceError> {
        let db = &*self.db_pool;

        let model = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        self.attach_inventories(model).await
    }

    async fn attach_inventories(
        &self,
        model: product::Model,
    ) -> Result<ProductWithInventories, ServiceError> {
        let db = &*self.db_pool;

        let inventories = InventoryEntity::find()
            .filter(product_inventory::Column::ProductId.eq(model.id))
            .all(db)
            .await?
            .into_iter()
            .map(|row| ProductInventoryView {
                branch_id: row.branch_id,
                on_hand: row.on_hand,
                cost: row.cost,
            })
            .collect();

        Ok(ProductWithInventories {
            id: model.id,
            code: model.code,
            name: model.name,
            unit: model.unit,
            is_active: model.is_active,
            inventories,
        })
    }
}

#[async_trait]
impl ProductLookup for ProductCatalogService {
    async fn product_with_inventories(
        &self,
        product_id: Uuid,
    ) -> Result<ProductWithInventories, ServiceError> {
        self.get_product(product_id).await
    }
}
