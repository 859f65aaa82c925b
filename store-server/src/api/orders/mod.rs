//! Order administration endpoints

pub mod handler;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::create_manual))
        .route("/api/orders/{id}", get(handler::detail))
        .route("/api/orders/{id}/history", get(handler::history))
        .route("/api/orders/{id}/status", patch(handler::update_status))
        .route(
            "/api/orders/{id}/payment-status",
            patch(handler::update_payment_status),
        )
        .route("/api/orders/{id}/refund", post(handler::refund))
        .route("/api/orders/{id}/verify", post(handler::verify))
        .route(
            "/api/orders/{id}/initiate-payment",
            post(handler::initiate_payment),
        )
        .route(
            "/api/orders/{id}/items/{item_id}",
            patch(handler::update_item),
        )
}
