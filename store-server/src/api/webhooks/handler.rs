use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::core::ServerState;
use crate::gateways::CallbackLinkage;
use crate::orders::engine::CallbackOutcome;
use crate::utils::{ok, AppResponse, AppResult};

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub order_id: i64,
    pub outcome: &'static str,
}

fn outcome_str(outcome: CallbackOutcome) -> &'static str {
    match outcome {
        CallbackOutcome::Applied(_) => "APPLIED",
        CallbackOutcome::NoOp => "NO_OP",
        CallbackOutcome::PendingVerification => "PENDING_VERIFICATION",
        CallbackOutcome::Ignored => "IGNORED",
    }
}

/// Provider callback. The body is untrusted and ignored; the linkage in
/// the query string identifies the order and the provider is queried
/// directly for the authoritative state. Idempotent retries get 200.
pub async fn payment_callback(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    Query(linkage): Query<CallbackLinkage>,
) -> AppResult<Json<AppResponse<CallbackResponse>>> {
    let outcome = state.engine.handle_callback(&provider, &linkage).await?;
    info!(
        order_id = linkage.order_id,
        provider = %provider,
        outcome = outcome_str(outcome),
        "Payment callback processed"
    );
    Ok(ok(CallbackResponse {
        order_id: linkage.order_id,
        outcome: outcome_str(outcome),
    }))
}
