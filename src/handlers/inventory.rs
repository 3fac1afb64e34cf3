use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::inventory::SetInventoryLevelRequest;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InventoryLevelParams {
    pub product_id: Uuid,
    pub branch_id: Uuid,
}

/// Create the inventory router
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_level))
        .route("/levels", post(set_level))
}

/// Get the stock level for a product at a branch
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryLevelParams),
    responses(
        (status = 200, description = "Inventory level returned", body = crate::services::inventory::InventoryLevelResponse),
        (status = 404, description = "No stock row for the pair", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_level(
    State(state): State<AppState>,
    Query(params): Query<InventoryLevelParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state
        .services
        .inventory
        .get_level(params.product_id, params.branch_id)
        .await?;
    Ok(Json(level))
}

/// Set (upsert) the stock level for a product at a branch
#[utoipa::path(
    post,
    path = "/api/v1/inventory/levels",
    request_body = SetInventoryLevelRequest,
    responses(
        (status = 200, description = "Inventory level stored", body = crate::services::inventory::InventoryLevelResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn set_level(
    State(state): State<AppState>,
    Json(payload): Json<SetInventoryLevelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state.services.inventory.set_level(payload).await?;
    Ok(Json(level))
}
