//! Payment provider webhooks

pub mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/payments/webhook/{provider}",
        post(handler::payment_callback),
    )
}
