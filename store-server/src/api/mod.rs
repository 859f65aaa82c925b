//! HTTP API
//!
//! Resource routers merged under `/api`. Every response uses the
//! [`AppResponse`](crate::utils::AppResponse) envelope. Admin operations
//! carry the operator in the request payload; requests without one are
//! rejected before any write.

pub mod blocked_customers;
pub mod checkout;
pub mod incomplete_orders;
pub mod orders;
pub mod webhooks;

use axum::Router;
use serde::Deserialize;

use crate::core::ServerState;
use crate::orders::Actor;
use crate::utils::AppError;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(checkout::router())
        .merge(webhooks::router())
        .merge(orders::router())
        .merge(incomplete_orders::router())
        .merge(blocked_customers::router())
        .with_state(state)
}

/// Operator identification embedded in admin payloads
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorMeta {
    pub operator_id: Option<i64>,
    pub operator_name: Option<String>,
}

impl OperatorMeta {
    /// Admin endpoints require both fields
    pub fn require_actor(&self) -> Result<Actor, AppError> {
        match (self.operator_id, self.operator_name.as_deref()) {
            (Some(id), Some(name)) if !name.trim().is_empty() => Ok(Actor::admin(id, name)),
            _ => Err(AppError::validation(
                "operator_id and operator_name are required",
            )),
        }
    }
}
