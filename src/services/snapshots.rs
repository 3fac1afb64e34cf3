use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{join_all, AbortHandle, Abortable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::metrics;

use super::products::ProductWithInventories;

/// Seam for fetching a product with its per-branch inventories. The catalog
/// service is the production implementation; tests inject doubles with
/// controlled latency.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn product_with_inventories(
        &self,
        product_id: Uuid,
    ) -> Result<ProductWithInventories, ServiceError>;
}

/// One line of a refresh request. Carries the caller's current price and
/// inventory snapshot so a failed lookup can echo them back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequestLine {
    pub product_id: Uuid,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub from_inventory: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub to_inventory: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    pub product_id: Uuid,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub from_inventory: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub to_inventory: Option<Decimal>,
    /// False when the lookup failed and the prior values were kept.
    pub refreshed: bool,
}

/// Cancellable inventory snapshot refresh, keyed by form session. A refresh
/// for a session supersedes any batch still in flight for the same session,
/// so a stale response can never overwrite a newer branch pair's figures.
#[derive(Clone)]
pub struct SnapshotService {
    lookup: Arc<dyn ProductLookup>,
    in_flight: Arc<DashMap<String, (u64, AbortHandle)>>,
    generation: Arc<AtomicU64>,
}

impl SnapshotService {
    pub fn new(lookup: Arc<dyn ProductLookup>) -> Self {
        Self {
            lookup,
            in_flight: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Re-fetches price and per-branch inventory for every line against the
    /// given branch pair. Individual lookup failures keep the submitted
    /// values; a superseding refresh aborts this one, which then fails with
    /// `RequestSuperseded`.
    #[instrument(skip(self, lines), fields(session = %session_key, lines = lines.len()))]
    pub async fn refresh(
        &self,
        session_key: &str,
        from_branch_id: Uuid,
        to_branch_id: Uuid,
        lines: Vec<SnapshotRequestLine>,
    ) -> Result<Vec<SnapshotLine>, ServiceError> {
        if from_branch_id == to_branch_id {
            return Err(ServiceError::ValidationError(
                "fromBranchId and toBranchId must differ".to_string(),
            ));
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (abort_handle, abort_registration) = AbortHandle::new_pair();

        if let Some((_, previous)) = self
            .in_flight
            .insert(session_key.to_string(), (generation, abort_handle))
        {
            debug!(session = %session_key, "superseding in-flight snapshot batch");
            previous.abort();
        }

        let lookup = self.lookup.clone();
        let batch = async move {
            let fetches = lines.into_iter().map(|line| {
                let lookup = lookup.clone();
                async move {
                    match lookup.product_with_inventories(line.product_id).await {
                        Ok(product) => SnapshotLine {
                            product_id: line.product_id,
                            price: product.cost_at(from_branch_id).or(line.price),
                            from_inventory: product.on_hand_at(from_branch_id),
                            to_inventory: product.on_hand_at(to_branch_id),
                            refreshed: true,
                        },
                        Err(e) => {
                            // One bad product must not abort the whole sync.
                            warn!(
                                product_id = %line.product_id,
                                error = %e,
                                "inventory lookup failed; keeping prior values"
                            );
                            SnapshotLine {
                                product_id: line.product_id,
                                price: line.price,
                                from_inventory: line.from_inventory,
                                to_inventory: line.to_inventory,
                                refreshed: false,
                            }
                        }
                    }
                }
            });
            join_all(fetches).await
        };

        let result = Abortable::new(batch, abort_registration).await;

        // Clear our registration unless a newer batch already replaced it.
        self.in_flight
            .remove_if(session_key, |_, entry| entry.0 == generation);

        match result {
            Ok(lines) => {
                metrics::increment_counter("inventory_snapshot_refreshes_total");
                Ok(lines)
            }
            Err(_aborted) => {
                metrics::increment_counter("inventory_snapshot_superseded_total");
                Err(ServiceError::RequestSuperseded)
            }
        }
    }
}
