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
use crate::services::products::CreateProductRequest;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct ProductSearchParams {
    /// Free-text search against product code and name
    pub search: Option<String>,
    pub limit: Option<u64>,
    /// Comma-separated branch ids scoping the search
    pub branch_ids: Option<String>,
}

fn parse_branch_ids(raw: Option<&str>) -> Result<Vec<Uuid>, ServiceError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            Uuid::parse_str(part).map_err(|_| {
                ServiceError::InvalidInput(format!("branchIds entry '{}' is not a valid UUID", part))
            })
        })
        .collect()
}

/// Create the products router
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_products).post(create_product))
        .route("/:id", get(get_product))
}

/// Search products, optionally scoped to branches
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductSearchParams),
    responses(
        (status = 200, description = "Matching products with nested inventories"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch_ids = parse_branch_ids(params.branch_ids.as_deref())?;
    let products = state
        .services
        .products
        .search_products(params.search, params.limit, branch_ids)
        .await?;
    Ok(Json(products))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate product code", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.products.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a product with its per-branch inventories
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product returned", body = crate::services::products::ProductWithInventories),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_ids_parse_comma_separated_uuids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{}, {}", a, b);
        assert_eq!(parse_branch_ids(Some(&raw)).unwrap(), vec![a, b]);
        assert!(parse_branch_ids(Some("nope")).is_err());
        assert!(parse_branch_ids(None).unwrap().is_empty());
        assert!(parse_branch_ids(Some("")).unwrap().is_empty());
    }
}
