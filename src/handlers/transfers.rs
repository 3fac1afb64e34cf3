use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::{acting_branch, form_session, AppState};
use crate::services::snapshots::SnapshotRequestLine;
use crate::services::transfers::{TransferListFilter, TransferPayload};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct ActorParams {
    /// Acting branch; the `x-branch-id` header takes precedence
    pub branch_id: Option<Uuid>,
}

/// Body of a snapshot refresh: the branch pair being edited plus the form's
/// current lines with their last-known price/inventory figures.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub lines: Vec<SnapshotRequestLine>,
}

/// Create the transfers router
pub fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/snapshot", post(refresh_snapshot))
        .route("/:id", get(get_transfer_view).put(update_transfer))
}

/// List transfers with filters
#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(TransferListFilter),
    responses(
        (status = 200, description = "Filtered transfer page", body = crate::services::transfers::TransferListResponse),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(filter): Query<TransferListFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.transfers.list_transfers(filter).await?;
    Ok(Json(page))
}

/// Create a transfer (sending branch only)
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    params(ActorParams),
    request_body = TransferPayload,
    responses(
        (status = 201, description = "Transfer created", body = crate::services::transfers::TransferResponse),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse),
        (status = 403, description = "Acting branch is not the sender", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at dispatch", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ActorParams>,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = acting_branch(&headers, params.branch_id)?;
    let created = state
        .services
        .transfers
        .create_transfer(branch, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Role-discriminated editing view of a transfer
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer ID"), ActorParams),
    responses(
        (status = 200, description = "Form view for the acting branch", body = crate::services::transfers::TransferFormView),
        (status = 403, description = "Branch is not a party", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn get_transfer_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Query(params): Query<ActorParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = acting_branch(&headers, params.branch_id)?;
    let view = state
        .services
        .transfers
        .get_transfer_view(id, branch)
        .await?;
    Ok(Json(view))
}

/// Update a transfer (role-gated)
#[utoipa::path(
    put,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer ID"), ActorParams),
    request_body = TransferPayload,
    responses(
        (status = 200, description = "Transfer updated", body = crate::services::transfers::TransferResponse),
        (status = 400, description = "Validation or transition failure", body = crate::errors::ErrorResponse),
        (status = 403, description = "Field or status not writable by this role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn update_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Query(params): Query<ActorParams>,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = acting_branch(&headers, params.branch_id)?;
    let updated = state
        .services
        .transfers
        .update_transfer(id, branch, payload)
        .await?;
    Ok(Json(updated))
}

/// Refresh price/inventory snapshots for the lines of an open form
#[utoipa::path(
    post,
    path = "/api/v1/transfers/snapshot",
    request_body = SnapshotRequest,
    responses(
        (status = 200, description = "Refreshed lines"),
        (status = 400, description = "Invalid branch pair", body = crate::errors::ErrorResponse),
        (status = 409, description = "Superseded by a newer refresh", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn refresh_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SnapshotRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = form_session(&headers);
    let lines = state
        .services
        .snapshots
        .refresh(
            &session,
            payload.from_branch_id,
            payload.to_branch_id,
            payload.lines,
        )
        .await?;
    Ok(Json(lines))
}
