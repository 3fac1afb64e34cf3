pub mod branches;
pub mod inventory;
pub mod products;
pub mod transfers;

use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    branches::BranchService, inventory::InventoryService, products::ProductCatalogService,
    snapshots::{ProductLookup, SnapshotService}, transfers::TransferService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Header carrying the acting branch; `branchId` query is the fallback.
pub const BRANCH_ID_HEADER: &str = "x-branch-id";

/// Header identifying a form session for snapshot supersession.
pub const FORM_SESSION_HEADER: &str = "x-form-session";

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub branches: Arc<BranchService>,
    pub products: Arc<ProductCatalogService>,
    pub inventory: Arc<InventoryService>,
    pub transfers: Arc<TransferService>,
    pub snapshots: Arc<SnapshotService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let branches = Arc::new(BranchService::new(db_pool.clone(), event_sender.clone()));
        let products = Arc::new(ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let inventory = Arc::new(InventoryService::new(db_pool.clone(), event_sender.clone()));
        let transfers = Arc::new(TransferService::new(
            db_pool,
            event_sender,
            config.transfer_code_prefix.clone(),
        ));
        let lookup: Arc<dyn ProductLookup> = products.clone();
        let snapshots = Arc::new(SnapshotService::new(lookup));

        Self {
            branches,
            products,
            inventory,
            transfers,
            snapshots,
        }
    }
}

/// Resolves the acting branch from the `X-Branch-Id` header, falling back
/// to an explicit query parameter.
pub fn acting_branch(
    headers: &HeaderMap,
    query_branch: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    if let Some(raw) = headers.get(BRANCH_ID_HEADER) {
        let value = raw.to_str().map_err(|_| {
            ServiceError::InvalidInput("x-branch-id header is not valid UTF-8".to_string())
        })?;
        return Uuid::parse_str(value).map_err(|_| {
            ServiceError::InvalidInput(format!("x-branch-id '{}' is not a valid UUID", value))
        });
    }
    query_branch.ok_or_else(|| {
        ServiceError::InvalidInput(
            "acting branch is required (x-branch-id header or branchId query parameter)"
                .to_string(),
        )
    })
}

/// Form session key for snapshot supersession; absent headers share a
/// single anonymous session.
pub fn form_session(headers: &HeaderMap) -> String {
    headers
        .get(FORM_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_query() {
        let branch = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            BRANCH_ID_HEADER,
            HeaderValue::from_str(&branch.to_string()).unwrap(),
        );

        assert_eq!(acting_branch(&headers, Some(other)).unwrap(), branch);
    }

    #[test]
    fn query_is_the_fallback() {
        let branch = Uuid::new_v4();
        assert_eq!(
            acting_branch(&HeaderMap::new(), Some(branch)).unwrap(),
            branch
        );
        assert!(acting_branch(&HeaderMap::new(), None).is_err());
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(BRANCH_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(acting_branch(&headers, None).is_err());
    }
}
