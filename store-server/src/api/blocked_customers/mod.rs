//! Blocked customer administration endpoints

pub mod handler;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/blocked-customers",
            get(handler::list).post(handler::create),
        )
        .route("/api/blocked-customers/{id}", delete(handler::remove))
}
