use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::branches::CreateBranchRequest;
use crate::PaginatedResponse;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct BranchListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create the branches router
pub fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_branches).post(create_branch))
        .route("/:id", get(get_branch))
}

/// List branches
#[utoipa::path(
    get,
    path = "/api/v1/branches",
    params(BranchListParams),
    responses(
        (status = 200, description = "Branch list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "branches"
)]
pub async fn list_branches(
    State(state): State<AppState>,
    Query(params): Query<BranchListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(params.limit);

    let (branches, total) = state.services.branches.list_branches(page, limit).await?;

    Ok(Json(PaginatedResponse {
        total_pages: total.div_ceil(limit),
        items: branches,
        total,
        page,
        limit,
    }))
}

/// Create a branch
#[utoipa::path(
    post,
    path = "/api/v1/branches",
    request_body = CreateBranchRequest,
    responses(
        (status = 201, description = "Branch created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate branch code", body = crate::errors::ErrorResponse)
    ),
    tag = "branches"
)]
pub async fn create_branch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.branches.create_branch(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a single branch
#[utoipa::path(
    get,
    path = "/api/v1/branches/{id}",
    params(("id" = Uuid, Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Branch returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "branches"
)]
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state.services.branches.get_branch(id).await?;
    Ok(Json(branch))
}
