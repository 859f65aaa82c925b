//! Incomplete order capture and conversion endpoints

pub mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/incomplete-orders",
            get(handler::list).post(handler::capture),
        )
        .route("/api/incomplete-orders/{id}", get(handler::detail))
        .route("/api/incomplete-orders/{id}/convert", post(handler::convert))
        .route("/api/incomplete-orders/{id}/abandon", post(handler::abandon))
}
