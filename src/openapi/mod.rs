use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storeflow API",
        version = "1.0.0",
        description = r#"
# Storeflow Branch Operations API

Backend for retail branch operations: the product catalog, per-branch
inventory levels, and the inter-branch stock transfer lifecycle.

## Transfers

A transfer moves line-item quantities from a sending branch to a receiving
branch through four states: draft (1), in-transit (2), received (3) and
cancelled (4). The sending branch owns the document until dispatch; the
receiving branch records what actually arrived. Status values travel as
integers, exactly as the original dashboard sent them.

## Acting branch

Mutating transfer endpoints resolve the acting branch from the
`X-Branch-Id` header (or a `branchId` query parameter) and gate fields and
status writes by that branch's role on the document.

## Errors

Failures return a consistent JSON body:

```json
{
  "error": "Bad Request",
  "message": "fromBranchId and toBranchId must differ",
  "request_id": "req-abc123",
  "timestamp": "2025-11-09T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "branches", description = "Branch directory"),
        (name = "products", description = "Product catalog and branch-scoped search"),
        (name = "inventory", description = "Per-branch stock levels"),
        (name = "transfers", description = "Inter-branch transfer lifecycle")
    ),
    paths(
        // Branches
        crate::handlers::branches::list_branches,
        crate::handlers::branches::create_branch,
        crate::handlers::branches::get_branch,

        // Products
        crate::handlers::products::search_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,

        // Inventory
        crate::handlers::inventory::get_level,
        crate::handlers::inventory::set_level,

        // Transfers
        crate::handlers::transfers::list_transfers,
        crate::handlers::transfers::create_transfer,
        crate::handlers::transfers::get_transfer_view,
        crate::handlers::transfers::update_transfer,
        crate::handlers::transfers::refresh_snapshot,
    ),
    components(
        schemas(
            // Branch types
            crate::services::branches::CreateBranchRequest,
            crate::services::branches::BranchResponse,

            // Product types
            crate::services::products::CreateProductRequest,
            crate::services::products::ProductWithInventories,
            crate::services::products::ProductInventoryView,

            // Inventory types
            crate::services::inventory::SetInventoryLevelRequest,
            crate::services::inventory::InventoryLevelResponse,

            // Transfer types
            crate::services::transfers::TransferPayload,
            crate::services::transfers::TransferLinePayload,
            crate::services::transfers::TransferResponse,
            crate::services::transfers::TransferLineResponse,
            crate::services::transfers::TransferListResponse,
            crate::services::transfers::TransferFormView,
            crate::services::transfers::SenderFormView,
            crate::services::transfers::ReceiverFormView,
            crate::services::transfers::FormLineView,
            crate::handlers::transfers::SnapshotRequest,
            crate::services::snapshots::SnapshotRequestLine,
            crate::services::snapshots::SnapshotLine,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_includes_transfer_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Storeflow API"));
        assert!(json.contains("/api/v1/transfers"));
        assert!(json.contains("/api/v1/transfers/snapshot"));
    }
}
