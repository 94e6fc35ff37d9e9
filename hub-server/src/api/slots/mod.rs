//! Pickup Slot API Module
//!
//! Admin-facing slot management. Reservation and release of slot units is
//! not exposed here: that happens inside the request lifecycle commands.

mod handler;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::core::ServerState;

/// Slot router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/slots", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}", patch(handler::update))
        .route("/{id}", delete(handler::remove))
}
