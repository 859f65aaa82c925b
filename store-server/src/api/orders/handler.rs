use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use shared::models::{
    CustomerInfo, Order, OrderDetail, OrderHistory, OrderItemDraft, PaymentMethod,
};
use shared::order::{OrderStatus, PaymentStatus};

use super::super::OperatorMeta;
use crate::core::ServerState;
use crate::orders::engine::{CallbackOutcome, PaymentInitiation};
use crate::utils::{ok, AppResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<Order>>>> {
    let limit = query.limit.clamp(1, 200);
    let orders = state.ledger.list(limit, query.offset.max(0)).await?;
    Ok(ok(orders))
}

pub async fn detail(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    Ok(ok(state.ledger.get_detail(id).await?))
}

pub async fn history(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<OrderHistory>>> {
    Ok(ok(state.ledger.history(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ManualOrderRequest {
    pub customer: CustomerInfo,
    pub items: Vec<OrderItemDraft>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_fee: f64,
    pub note: Option<String>,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn create_manual(
    State(state): State<ServerState>,
    Json(req): Json<ManualOrderRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let actor = req.operator.require_actor()?;
    let order = state
        .composer
        .create_manual(
            &req.customer,
            req.items,
            req.payment_method,
            req.shipping_fee,
            req.note.as_deref(),
            &actor,
        )
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let actor = req.operator.require_actor()?;
    let order = state
        .engine
        .admin_update_status(id, req.status, &actor, req.note.as_deref())
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusUpdateRequest {
    pub payment_status: PaymentStatus,
    pub note: Option<String>,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn update_payment_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<PaymentStatusUpdateRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let actor = req.operator.require_actor()?;
    let order = state
        .engine
        .admin_update_payment_status(id, req.payment_status, &actor, req.note.as_deref())
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: f64,
    pub reason: String,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn refund(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<RefundRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let actor = req.operator.require_actor()?;
    let order = state
        .refunds
        .refund(id, req.amount, &req.reason, &actor)
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

/// Start (or restart) the hosted checkout session for an order whose
/// earlier initiation failed or was never attempted
pub async fn initiate_payment(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<InitiatePaymentRequest>,
) -> AppResult<Json<AppResponse<PaymentInitiation>>> {
    req.operator.require_actor()?;
    Ok(ok(state.engine.initiate_payment(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub outcome: String,
    #[serde(flatten)]
    pub order: Order,
}

/// Manual reconciliation against the payment provider
pub async fn verify(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<VerifyRequest>,
) -> AppResult<Json<AppResponse<VerifyResponse>>> {
    req.operator.require_actor()?;
    let outcome = state.engine.reconcile(id).await?;
    let order = state.ledger.get(id).await?;
    let outcome = match outcome {
        CallbackOutcome::Applied(_) => "APPLIED",
        CallbackOutcome::NoOp => "NO_OP",
        CallbackOutcome::PendingVerification => "PENDING_VERIFICATION",
        CallbackOutcome::Ignored => "IGNORED",
    };
    Ok(ok(VerifyResponse {
        outcome: outcome.to_owned(),
        order,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ItemUpdateRequest {
    pub quantity: i64,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn update_item(
    State(state): State<ServerState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<ItemUpdateRequest>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    req.operator.require_actor()?;
    let detail = state.ledger.update_item_quantity(id, item_id, req.quantity).await?;
    Ok(ok(detail))
}
