use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use shared::models::{BlockedCustomer, BlockedCustomerCreate};

use super::super::OperatorMeta;
use crate::core::ServerState;
use crate::utils::{ok, AppResponse, AppResult};

pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<BlockedCustomer>>>> {
    Ok(ok(state.gate.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    #[serde(flatten)]
    pub block: BlockedCustomerCreate,
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn create(
    State(state): State<ServerState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<AppResponse<BlockedCustomer>>> {
    let actor = req.operator.require_actor()?;
    let entry = state.gate.block(req.block, actor.id).await?;
    Ok(ok(entry))
}

#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    #[serde(flatten)]
    pub operator: OperatorMeta,
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UnblockRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    req.operator.require_actor()?;
    state.gate.unblock(id).await?;
    Ok(ok(()))
}
