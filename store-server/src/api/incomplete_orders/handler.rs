use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shared::models::{IncompleteOrder, IncompleteOrderCreate, IncompleteOrderStatus, Order, PaymentMethod};

use super::super::OperatorMeta;
use crate::core::ServerState;
use crate::utils::{ok, AppResponse, AppResult};

/// Storefront capture of an abandoned checkout; no operator involved
pub async fn capture(
    State(state): State<ServerState>,
    Json(req): Json<IncompleteOrderCreate>,
) -> AppResult<Json<AppResponse<IncompleteOrder>>> {
    Ok(ok(state.composer.record_incomplete(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<IncompleteOrderStatus>,
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<IncompleteOrder>>>> {
    Ok(ok(state.composer.list_incomplete(query.status).await?))
}

pub async fn detail(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<IncompleteOrder>>> {
    Ok(ok(state.composer.get_incomplete(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn convert(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<ConvertRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let actor = req.operator.require_actor()?;
    let order = state
        .composer
        .convert_from_incomplete(id, req.payment_method, &actor)
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct AbandonRequest {
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn abandon(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<AbandonRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    req.operator.require_actor()?;
    state.composer.abandon_incomplete(id).await?;
    Ok(ok(()))
}
