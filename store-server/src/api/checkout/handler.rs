use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use shared::models::{CartLine, CustomerInfo, Order, PaymentMethod};
use tracing::warn;

use crate::core::ServerState;
use crate::utils::{ok, AppResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerInfo,
    pub items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_fee: f64,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub order: Order,
    /// Hosted checkout redirect; absent for cash on delivery and when
    /// the gateway could not be reached at initiate time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

pub async fn checkout(
    State(state): State<ServerState>,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<Json<AppResponse<CheckoutResponse>>> {
    let order = state
        .composer
        .create_from_cart(
            &req.customer,
            &req.items,
            req.payment_method,
            req.shipping_fee,
            req.note.as_deref(),
        )
        .await?;

    // The order exists either way; a gateway hiccup at initiate time is
    // recoverable through the admin initiate-payment endpoint, so it
    // must not fail the checkout.
    let payment_url = if req.payment_method.is_hosted() {
        match state.engine.initiate_payment(order.id).await {
            Ok(initiation) => Some(initiation.payment_url),
            Err(e) => {
                warn!(order_id = order.id, error = %e, "Payment initiation failed at checkout");
                None
            }
        }
    } else {
        None
    };

    let order = state.ledger.get(order.id).await?;
    Ok(ok(CheckoutResponse { order, payment_url }))
}
