use crate::{
    db::DbPool,
    entities::branch::{self, ActiveModel as BranchActiveModel, Entity as BranchEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 50, message = "Branch code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Branch name is required"))]
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
}

impl From<branch::Model> for BranchResponse {
    fn from(model: branch::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            address: model.address,
            is_active: model.is_active,
        }
    }
}

/// Branch directory service
#[derive(Clone)]
pub struct BranchService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl BranchService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_branch(
        &self,
        request: CreateBranchRequest,
    ) -> Result<BranchResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let existing = BranchEntity::find()
            .filter(branch::Column::Code.eq(request.code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Branch code '{}' already exists",
                request.code
            )));
        }

        let branch_id = Uuid::new_v4();
        let model = BranchActiveModel {
            id: Set(branch_id),
            code: Set(request.code),
            name: Set(request.name),
            address: Set(request.address),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!(error = %e, branch_id = %branch_id, "Failed to create branch");
            ServiceError::DatabaseError(e)
        })?;

        if let Err(e) = self.event_sender.send(Event::BranchCreated(branch_id)).await {
            error!(error = %e, "Failed to publish branch created event");
        }

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn get_branch(&self, branch_id: Uuid) -> Result<BranchResponse, ServiceError> {
        let db = &*self.db_pool;

        let branch = BranchEntity::find_by_id(branch_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Branch {} not found", branch_id)))?;

        Ok(branch.into())
    }

    /// Lists branches, active first, ordered by code.
    #[instrument(skip(self))]
    pub async fn list_branches(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<BranchResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = BranchEntity::find()
            .order_by_asc(branch::Column::Code)
            .paginate(db, limit);

        let total = paginator.num_items().await?;
        let branches = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((branches.into_iter().map(Into::into).collect(), total))
    }
}
