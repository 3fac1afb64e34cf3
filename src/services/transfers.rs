use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        branch::Entity as BranchEntity,
        product::Entity as ProductEntity,
        transfer::{self, ActiveModel as TransferActiveModel, Entity as TransferEntity},
        transfer_line::{self, ActiveModel as LineActiveModel, Entity as LineEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::TransferMetrics,
    models::{DateField, DatePreset, ReceiveStatus, TransferRole, TransferStatus},
    services::inventory::InventoryService,
};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferLinePayload {
    pub product_id: Uuid,
    pub product_code: Option<String>,
    #[schema(value_type = f64)]
    pub send_quantity: Decimal,
    #[schema(value_type = Option<f64>)]
    pub received_quantity: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    #[schema(value_type = i16)]
    pub status: TransferStatus,
    /// Sender's note. `description` is accepted as the legacy field name.
    #[serde(alias = "description")]
    pub note_by_source: Option<String>,
    pub note_by_destination: Option<String>,
    pub transfer_details: Vec<TransferLinePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    #[schema(value_type = f64)]
    pub send_quantity: Decimal,
    #[schema(value_type = f64)]
    pub received_quantity: Decimal,
    #[schema(value_type = f64)]
    pub price: Decimal,
}

impl From<transfer_line::Model> for TransferLineResponse {
    fn from(model: transfer_line::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_code: model.product_code,
            product_name: model.product_name,
            send_quantity: model.send_quantity,
            received_quantity: model.received_quantity,
            price: model.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub id: Uuid,
    pub code: String,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    #[schema(value_type = i16)]
    pub status: TransferStatus,
    pub note_by_source: Option<String>,
    pub note_by_destination: Option<String>,
    pub transfer_date: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    /// Derived sent-vs-received comparison, never persisted.
    #[schema(value_type = String)]
    pub receive_status: ReceiveStatus,
    pub version: i32,
    pub transfer_details: Vec<TransferLineResponse>,
}

/// A transfer line as the editing form sees it: the persisted line plus
/// live per-branch inventory, fetched at view time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormLineView {
    pub line: TransferLineResponse,
    #[schema(value_type = Option<f64>)]
    pub from_inventory: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub to_inventory: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SenderFormView {
    pub transfer: TransferResponse,
    pub lines: Vec<FormLineView>,
    /// The branch pair is locked once a transfer exists.
    pub branches_locked: bool,
    /// Send quantities, prices and the source note stay editable until the
    /// transfer reaches a terminal status.
    pub lines_editable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverFormView {
    pub transfer: TransferResponse,
    pub lines: Vec<FormLineView>,
    /// Received quantities and the destination note are editable only while
    /// the transfer is in transit.
    pub receipt_editable: bool,
}

/// The two explicit faces of the editing form, selected by the acting
/// branch's role. Sender-owned fields never render editable to a receiver.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TransferFormView {
    Sender(SenderFormView),
    Receiver(ReceiverFormView),
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct TransferListFilter {
    pub from_branch_id: Option<Uuid>,
    pub to_branch_id: Option<Uuid>,
    /// Comma-separated wire statuses, e.g. `1,2`
    pub status: Option<String>,
    /// Which date the time filter applies to (`transferDate` or `receiptDate`)
    #[param(value_type = Option<String>)]
    pub date_field: Option<DateField>,
    /// Named range preset (`today`, `thisWeek`, `last30Days`, ...)
    #[param(value_type = Option<String>)]
    pub preset: Option<DatePreset>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Derived reconciliation filter (`matched` / `unmatched`), applied to
    /// the loaded page after the query
    #[param(value_type = Option<String>)]
    pub receive_status: Option<ReceiveStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferListResponse {
    pub transfers: Vec<TransferResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

// ---------------------------------------------------------------------------
// Validation guards
// ---------------------------------------------------------------------------

/// Receipt bound: 0 <= received <= send.
fn validate_received_bounds(send: Decimal, received: Decimal) -> Result<(), ServiceError> {
    if received < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "receivedQuantity must not be negative".to_string(),
        ));
    }
    if received > send {
        return Err(ServiceError::ValidationError(format!(
            "receivedQuantity {} exceeds sendQuantity {}",
            received, send
        )));
    }
    Ok(())
}

/// Shared pre-submit checks: branch pair set and distinct, at least one
/// line, no duplicate products, every send quantity positive. Nothing here
/// touches the database; a payload failing these never reaches it.
fn validate_payload(payload: &TransferPayload) -> Result<(), ServiceError> {
    if payload.from_branch_id.is_nil() || payload.to_branch_id.is_nil() {
        return Err(ServiceError::ValidationError(
            "fromBranchId and toBranchId are required".to_string(),
        ));
    }
    if payload.from_branch_id == payload.to_branch_id {
        return Err(ServiceError::ValidationError(
            "fromBranchId and toBranchId must differ".to_string(),
        ));
    }
    if payload.transfer_details.is_empty() {
        return Err(ServiceError::ValidationError(
            "a transfer requires at least one line item".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for line in &payload.transfer_details {
        if !seen.insert(line.product_id) {
            return Err(ServiceError::ValidationError(format!(
                "product {} is already in the line list",
                line.product_id
            )));
        }
        if line.send_quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "sendQuantity must be positive for product {}",
                line.product_id
            )));
        }
        if let Some(received) = line.received_quantity {
            validate_received_bounds(line.send_quantity, received)?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Service owning the transfer lifecycle: role-gated creation and editing,
/// status transitions, and the stock movement tied to dispatch, receipt and
/// cancellation.
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    code_prefix: String,
    metrics: Arc<TransferMetrics>,
}

impl TransferService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, code_prefix: String) -> Self {
        Self {
            db_pool,
            event_sender,
            code_prefix,
            metrics: Arc::new(TransferMetrics::new()),
        }
    }

    fn generate_code(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.code_prefix, &suffix[..12].to_uppercase())
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            error!(error = %e, "Failed to publish transfer event");
        }
    }

    /// Creates a transfer. Only the sending branch may create one, in draft
    /// or directly in transit; creating in transit performs the dispatch
    /// stock deduction in the same transaction.
    #[instrument(skip(self, payload), fields(acting_branch = %acting_branch))]
    pub async fn create_transfer(
        &self,
        acting_branch: Uuid,
        payload: TransferPayload,
    ) -> Result<TransferResponse, ServiceError> {
        validate_payload(&payload)?;

        if acting_branch != payload.from_branch_id {
            return Err(ServiceError::Forbidden(
                "only the sending branch may create a transfer".to_string(),
            ));
        }
        if !matches!(
            payload.status,
            TransferStatus::Draft | TransferStatus::InTransit
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "a new transfer must start as draft or in-transit, not {}",
                payload.status
            )));
        }

        let db = &*self.db_pool;

        for branch_id in [payload.from_branch_id, payload.to_branch_id] {
            BranchEntity::find_by_id(branch_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Branch {} not found", branch_id)))?;
        }

        let lines = self
            .build_lines(db, &payload, payload.from_branch_id, &HashMap::new())
            .await?;

        let now = Utc::now();
        let transfer_id = Uuid::new_v4();
        let dispatching = payload.status == TransferStatus::InTransit;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for transfer creation");
            ServiceError::DatabaseError(e)
        })?;

        let transfer_model = TransferActiveModel {
            id: Set(transfer_id),
            code: Set(self.generate_code()),
            from_branch_id: Set(payload.from_branch_id),
            to_branch_id: Set(payload.to_branch_id),
            status: Set(i16::from(payload.status)),
            note_by_source: Set(payload.note_by_source.clone()),
            note_by_destination: Set(None),
            transfer_date: Set(now),
            dispatched_at: Set(dispatching.then_some(now)),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };
        let created = transfer_model.insert(&txn).await?;

        for line in &lines {
            let active = LineActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(transfer_id),
                product_id: Set(line.product_id),
                product_code: Set(line.product_code.clone()),
                product_name: Set(line.product_name.clone()),
                send_quantity: Set(line.send_quantity),
                received_quantity: Set(line.received_quantity),
                price: Set(line.price),
                created_at: Set(now),
            };
            active.insert(&txn).await?;

            if dispatching {
                InventoryService::apply_delta(
                    &txn,
                    line.product_id,
                    payload.from_branch_id,
                    -line.send_quantity,
                )
                .await?;
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, transfer_id = %transfer_id, "Failed to commit transfer creation");
            ServiceError::DatabaseError(e)
        })?;

        self.metrics.created.inc();
        self.publish(Event::TransferCreated {
            transfer_id,
            from_branch_id: payload.from_branch_id,
            to_branch_id: payload.to_branch_id,
            line_count: lines.len(),
        })
        .await;
        if dispatching {
            self.metrics.dispatched.inc();
            self.publish(Event::TransferDispatched {
                transfer_id,
                from_branch_id: payload.from_branch_id,
                to_branch_id: payload.to_branch_id,
            })
            .await;
        }

        self.get_transfer(created.id).await
    }

    /// Updates a transfer. The acting branch's role decides which fields the
    /// payload may change and which statuses it may write; the transition
    /// table is enforced before anything is persisted.
    #[instrument(skip(self, payload), fields(transfer_id = %transfer_id, acting_branch = %acting_branch))]
    pub async fn update_transfer(
        &self,
        transfer_id: Uuid,
        acting_branch: Uuid,
        payload: TransferPayload,
    ) -> Result<TransferResponse, ServiceError> {
        let db = &*self.db_pool;

        let existing = TransferEntity::find_by_id(transfer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
            })?;
        let stored_lines = LineEntity::find()
            .filter(transfer_line::Column::TransferId.eq(transfer_id))
            .all(db)
            .await?;

        let current = TransferStatus::try_from(existing.status)
            .map_err(ServiceError::InvalidStatus)?;
        if current.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "transfer {} is {}; no further edits are allowed",
                existing.code, current
            )));
        }

        let role = TransferRole::for_branch(
            acting_branch,
            existing.from_branch_id,
            existing.to_branch_id,
        )
        .ok_or_else(|| {
            ServiceError::Forbidden(format!(
                "branch {} is not a party to transfer {}",
                acting_branch, existing.code
            ))
        })?;

        if payload.from_branch_id != existing.from_branch_id
            || payload.to_branch_id != existing.to_branch_id
        {
            return Err(ServiceError::ValidationError(
                "the branch pair is locked once a transfer exists".to_string(),
            ));
        }

        let target = payload.status;
        if !role.may_write_status(target) {
            return Err(ServiceError::Forbidden(format!(
                "the {} branch may not set status {}",
                role, target
            )));
        }
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition from {} to {}",
                current, target
            )));
        }

        match role {
            TransferRole::Sender => {
                self.apply_sender_update(existing, stored_lines, current, payload)
                    .await
            }
            TransferRole::Receiver => {
                self.apply_receiver_update(existing, stored_lines, current, payload)
                    .await
            }
        }
    }

    async fn apply_sender_update(
        &self,
        existing: transfer::Model,
        stored_lines: Vec<transfer_line::Model>,
        current: TransferStatus,
        payload: TransferPayload,
    ) -> Result<TransferResponse, ServiceError> {
        validate_payload(&payload)?;

        // The destination note belongs to the receiving branch.
        if payload.note_by_destination.is_some()
            && payload.note_by_destination != existing.note_by_destination
        {
            return Err(ServiceError::Forbidden(
                "the destination note belongs to the receiving branch".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let target = payload.status;
        let in_flight: HashMap<Uuid, Decimal> = if current == TransferStatus::InTransit {
            stored_lines
                .iter()
                .map(|line| (line.product_id, line.send_quantity))
                .collect()
        } else {
            HashMap::new()
        };
        let lines = self
            .build_lines(db, &payload, existing.from_branch_id, &in_flight)
            .await?;

        let transfer_id = existing.id;
        let from_branch_id = existing.from_branch_id;
        let to_branch_id = existing.to_branch_id;
        let now = Utc::now();

        let txn = db.begin().await?;

        // Dispatch already deducted stock for the old lines; give it back
        // before the replacement lines settle the new balance.
        if current == TransferStatus::InTransit {
            for line in &stored_lines {
                InventoryService::apply_delta(
                    &txn,
                    line.product_id,
                    from_branch_id,
                    line.send_quantity,
                )
                .await?;
            }
        }

        LineEntity::delete_many()
            .filter(transfer_line::Column::TransferId.eq(transfer_id))
            .exec(&txn)
            .await?;

        for line in &lines {
            let active = LineActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(transfer_id),
                product_id: Set(line.product_id),
                product_code: Set(line.product_code.clone()),
                product_name: Set(line.product_name.clone()),
                send_quantity: Set(line.send_quantity),
                received_quantity: Set(line.received_quantity),
                price: Set(line.price),
                created_at: Set(now),
            };
            active.insert(&txn).await?;

            if target == TransferStatus::InTransit {
                InventoryService::apply_delta(
                    &txn,
                    line.product_id,
                    from_branch_id,
                    -line.send_quantity,
                )
                .await?;
            }
        }

        let version = existing.version + 1;
        let dispatched_at = match (current, target) {
            (TransferStatus::Draft, TransferStatus::InTransit) => Some(now),
            _ => existing.dispatched_at,
        };

        let mut active: TransferActiveModel = existing.into();
        active.status = Set(i16::from(target));
        active.note_by_source = Set(payload.note_by_source.clone());
        active.dispatched_at = Set(dispatched_at);
        active.updated_at = Set(Some(now));
        active.version = Set(version);
        active.update(&txn).await?;

        txn.commit().await?;

        self.publish(Event::TransferUpdated {
            transfer_id,
            version,
        })
        .await;
        match (current, target) {
            (TransferStatus::Draft, TransferStatus::InTransit) => {
                self.metrics.dispatched.inc();
                self.publish(Event::TransferDispatched {
                    transfer_id,
                    from_branch_id,
                    to_branch_id,
                })
                .await;
            }
            (_, TransferStatus::Cancelled) => {
                self.metrics.cancelled.inc();
                self.publish(Event::TransferCancelled {
                    transfer_id,
                    restocked: current == TransferStatus::InTransit,
                })
                .await;
            }
            _ => {}
        }

        self.get_transfer(transfer_id).await
    }

    async fn apply_receiver_update(
        &self,
        existing: transfer::Model,
        stored_lines: Vec<transfer_line::Model>,
        current: TransferStatus,
        payload: TransferPayload,
    ) -> Result<TransferResponse, ServiceError> {
        if current != TransferStatus::InTransit {
            return Err(ServiceError::Forbidden(
                "the receiving branch may only edit an in-transit transfer".to_string(),
            ));
        }
        if payload.note_by_source.is_some()
            && payload.note_by_source != existing.note_by_source
        {
            return Err(ServiceError::Forbidden(
                "the source note belongs to the sending branch".to_string(),
            ));
        }

        let stored_by_product: HashMap<Uuid, &transfer_line::Model> = stored_lines
            .iter()
            .map(|line| (line.product_id, line))
            .collect();

        if payload.transfer_details.len() != stored_lines.len() {
            return Err(ServiceError::Forbidden(
                "the receiving branch may not modify line items".to_string(),
            ));
        }

        // Validate every line before anything is written: send quantity and
        // price are sender-owned, received quantity must stay in bounds.
        let mut receipt_updates: Vec<(Uuid, Decimal)> = Vec::with_capacity(stored_lines.len());
        for line in &payload.transfer_details {
            let stored = stored_by_product.get(&line.product_id).ok_or_else(|| {
                ServiceError::Forbidden(
                    "the receiving branch may not modify line items".to_string(),
                )
            })?;
            if line.send_quantity != stored.send_quantity {
                return Err(ServiceError::Forbidden(
                    "sendQuantity is read-only for the receiving branch".to_string(),
                ));
            }
            if let Some(price) = line.price {
                if price != stored.price {
                    return Err(ServiceError::Forbidden(
                        "price is read-only for the receiving branch".to_string(),
                    ));
                }
            }
            let received = line.received_quantity.unwrap_or(stored.received_quantity);
            validate_received_bounds(stored.send_quantity, received)?;
            receipt_updates.push((stored.id, received));
        }

        let db = &*self.db_pool;
        let transfer_id = existing.id;
        let to_branch_id = existing.to_branch_id;
        let target = payload.status;
        let now = Utc::now();

        let txn = db.begin().await?;

        for (line_id, received) in &receipt_updates {
            let mut active = LineActiveModel {
                id: Set(*line_id),
                ..Default::default()
            };
            active.received_quantity = Set(*received);
            LineEntity::update(active).exec(&txn).await?;
        }

        // Receipt credits the destination branch with what actually arrived.
        if target == TransferStatus::Received {
            for line in &stored_lines {
                let received = receipt_updates
                    .iter()
                    .find(|(id, _)| *id == line.id)
                    .map(|(_, received)| *received)
                    .unwrap_or(line.received_quantity);
                if received > Decimal::ZERO {
                    InventoryService::apply_delta(&txn, line.product_id, to_branch_id, received)
                        .await?;
                }
            }
        }

        let version = existing.version + 1;
        let note_by_destination = payload
            .note_by_destination
            .clone()
            .or_else(|| existing.note_by_destination.clone());

        let mut active: TransferActiveModel = existing.into();
        active.status = Set(i16::from(target));
        active.note_by_destination = Set(note_by_destination);
        active.received_at = Set((target == TransferStatus::Received).then_some(now));
        active.updated_at = Set(Some(now));
        active.version = Set(version);
        active.update(&txn).await?;

        txn.commit().await?;

        self.publish(Event::TransferUpdated {
            transfer_id,
            version,
        })
        .await;
        if target == TransferStatus::Received {
            self.metrics.received.inc();
            self.publish(Event::TransferReceived {
                transfer_id,
                to_branch_id,
            })
            .await;
        } else {
            self.publish(Event::TransferReceiptRecorded {
                transfer_id,
                to_branch_id,
            })
            .await;
        }

        self.get_transfer(transfer_id).await
    }

    /// Resolves products and snapshots code, name and unit cost for each
    /// payload line. The on-hand guard mirrors the form's advisory check;
    /// dispatch re-validates against live balances inside its transaction.
    /// `in_flight` carries quantities this transfer has already deducted,
    /// which the update transaction will restore before re-deducting.
    async fn build_lines(
        &self,
        db: &DbPool,
        payload: &TransferPayload,
        from_branch_id: Uuid,
        in_flight: &HashMap<Uuid, Decimal>,
    ) -> Result<Vec<transfer_line::Model>, ServiceError> {
        let mut lines = Vec::with_capacity(payload.transfer_details.len());

        for detail in &payload.transfer_details {
            let product = ProductEntity::find_by_id(detail.product_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", detail.product_id))
                })?;

            let inventory =
                InventoryService::level(db, detail.product_id, from_branch_id).await?;
            let available = inventory
                .as_ref()
                .map(|row| row.on_hand)
                .unwrap_or(Decimal::ZERO)
                + in_flight
                    .get(&detail.product_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
            if detail.send_quantity > available {
                return Err(ServiceError::ValidationError(format!(
                    "sendQuantity {} for product {} exceeds on-hand {} at the source branch",
                    detail.send_quantity, product.code, available
                )));
            }

            let price = detail
                .price
                .or_else(|| inventory.as_ref().map(|row| row.cost))
                .unwrap_or(Decimal::ZERO);

            lines.push(transfer_line::Model {
                id: Uuid::new_v4(),
                transfer_id: Uuid::nil(),
                product_id: product.id,
                product_code: product.code,
                product_name: product.name,
                send_quantity: detail.send_quantity,
                // The receiver has not weighed in yet.
                received_quantity: detail.send_quantity,
                price,
                created_at: Utc::now(),
            });
        }

        Ok(lines)
    }

    #[instrument(skip(self))]
    pub async fn get_transfer(&self, transfer_id: Uuid) -> Result<TransferResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = TransferEntity::find_by_id(transfer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
            })?;
        let lines = LineEntity::find()
            .filter(transfer_line::Column::TransferId.eq(transfer_id))
            .all(db)
            .await?;

        build_response(model, lines)
    }

    /// The editing form for a transfer, shaped by the acting branch's role.
    /// Per-line inventory lookups that fail are logged and surface as
    /// missing snapshots rather than failing the whole view.
    #[instrument(skip(self), fields(transfer_id = %transfer_id, acting_branch = %acting_branch))]
    pub async fn get_transfer_view(
        &self,
        transfer_id: Uuid,
        acting_branch: Uuid,
    ) -> Result<TransferFormView, ServiceError> {
        let db = &*self.db_pool;

        let response = self.get_transfer(transfer_id).await?;
        let role = TransferRole::for_branch(
            acting_branch,
            response.from_branch_id,
            response.to_branch_id,
        )
        .ok_or_else(|| {
            ServiceError::Forbidden(format!(
                "branch {} is not a party to transfer {}",
                acting_branch, response.code
            ))
        })?;

        let mut lines = Vec::with_capacity(response.transfer_details.len());
        for line in &response.transfer_details {
            let from_inventory =
                match InventoryService::level(db, line.product_id, response.from_branch_id).await {
                    Ok(level) => level.map(|row| row.on_hand),
                    Err(e) => {
                        warn!(product_id = %line.product_id, error = %e, "source inventory lookup failed");
                        None
                    }
                };
            let to_inventory =
                match InventoryService::level(db, line.product_id, response.to_branch_id).await {
                    Ok(level) => level.map(|row| row.on_hand),
                    Err(e) => {
                        warn!(product_id = %line.product_id, error = %e, "destination inventory lookup failed");
                        None
                    }
                };
            lines.push(FormLineView {
                line: line.clone(),
                from_inventory,
                to_inventory,
            });
        }

        let status = response.status;
        Ok(match role {
            TransferRole::Sender => TransferFormView::Sender(SenderFormView {
                transfer: response,
                lines,
                branches_locked: true,
                lines_editable: !status.is_terminal(),
            }),
            TransferRole::Receiver => TransferFormView::Receiver(ReceiverFormView {
                transfer: response,
                lines,
                receipt_editable: status == TransferStatus::InTransit,
            }),
        })
    }

    /// Filtered, paginated listing. The derived receive-status filter is
    /// applied to the loaded page after the query; totals reflect the SQL
    /// filters only.
    #[instrument(skip(self, filter))]
    pub async fn list_transfers(
        &self,
        filter: TransferListFilter,
    ) -> Result<TransferListResponse, ServiceError> {
        let db = &*self.db_pool;

        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.limit.unwrap_or(20).clamp(1, 100);

        let mut condition = Condition::all();
        if let Some(from) = filter.from_branch_id {
            condition = condition.add(transfer::Column::FromBranchId.eq(from));
        }
        if let Some(to) = filter.to_branch_id {
            condition = condition.add(transfer::Column::ToBranchId.eq(to));
        }
        if let Some(raw) = filter.status.as_deref() {
            let statuses = parse_status_filter(raw)?;
            if !statuses.is_empty() {
                condition = condition.add(
                    transfer::Column::Status.is_in(statuses.into_iter().map(i16::from)),
                );
            }
        }

        let date_column = match filter.date_field.unwrap_or_default() {
            DateField::TransferDate => transfer::Column::TransferDate,
            DateField::ReceiptDate => transfer::Column::ReceivedAt,
        };
        let (range_start, range_end) = match (filter.date_from, filter.date_to) {
            (None, None) => filter
                .preset
                .and_then(|preset| preset.resolve(Utc::now()))
                .map(|range| (Some(range.start), Some(range.end)))
                .unwrap_or((None, None)),
            explicit => explicit,
        };
        if let Some(start) = range_start {
            condition = condition.add(date_column.gte(start));
        }
        if let Some(end) = range_end {
            condition = condition.add(date_column.lt(end));
        }

        let paginator = TransferEntity::find()
            .filter(condition)
            .order_by_desc(transfer::Column::TransferDate)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page - 1).await?;

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut lines_by_transfer: HashMap<Uuid, Vec<transfer_line::Model>> = HashMap::new();
        if !ids.is_empty() {
            for line in LineEntity::find()
                .filter(transfer_line::Column::TransferId.is_in(ids))
                .all(db)
                .await?
            {
                lines_by_transfer
                    .entry(line.transfer_id)
                    .or_default()
                    .push(line);
            }
        }

        let mut transfers = Vec::with_capacity(models.len());
        for model in models {
            let lines = lines_by_transfer.remove(&model.id).unwrap_or_default();
            transfers.push(build_response(model, lines)?);
        }

        if let Some(wanted) = filter.receive_status {
            transfers.retain(|t| t.receive_status == wanted);
        }

        Ok(TransferListResponse {
            transfers,
            total,
            page,
            per_page,
        })
    }
}

fn parse_status_filter(raw: &str) -> Result<Vec<TransferStatus>, ServiceError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i16>()
                .map_err(|_| {
                    ServiceError::InvalidInput(format!("invalid status value '{}'", part))
                })
                .and_then(|value| {
                    TransferStatus::try_from(value).map_err(ServiceError::InvalidInput)
                })
        })
        .collect()
}

fn build_response(
    model: transfer::Model,
    mut lines: Vec<transfer_line::Model>,
) -> Result<TransferResponse, ServiceError> {
    lines.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.product_code.cmp(&b.product_code))
    });

    let status = TransferStatus::try_from(model.status).map_err(ServiceError::InvalidStatus)?;
    let receive_status = ReceiveStatus::classify(
        lines
            .iter()
            .map(|line| (&line.send_quantity, &line.received_quantity)),
    );

    Ok(TransferResponse {
        id: model.id,
        code: model.code,
        from_branch_id: model.from_branch_id,
        to_branch_id: model.to_branch_id,
        status,
        note_by_source: model.note_by_source,
        note_by_destination: model.note_by_destination,
        transfer_date: model.transfer_date,
        dispatched_at: model.dispatched_at,
        received_at: model.received_at,
        receive_status,
        version: model.version,
        transfer_details: lines.into_iter().map(Into::into).collect(),
    })
}
