//! Request API Module
//!
//! All mutations go through the RequestManager command pipeline; the GET
//! routes are read-only views over snapshots and the event trail.

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

/// Request router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/requests", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Command pipeline (create, pickup, advance, deliver, cancel)
        .route("/commands", post(handler::submit_command))
        // Active (non-terminal) requests
        .route("/", get(handler::list_active))
        // Event trail since a sequence number (audit / sync cursor)
        .route("/events", get(handler::get_events_since))
        // Lookup by QR token (pickup station scan)
        .route("/by-code/{code}", get(handler::get_by_code))
        // One student's requests, terminal ones included
        .route("/students/{student_id}", get(handler::list_for_student))
        // Single request
        .route("/{id}", get(handler::get_by_id))
        // Full event trail for one request
        .route("/{id}/events", get(handler::get_request_events))
}
