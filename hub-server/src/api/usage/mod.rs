//! Usage API Module
//!
//! Weekly usage reports plus the admin overrides (flag, extra charge).
//! Counters themselves are maintained by the request lifecycle commands.

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

/// Usage router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/usage", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Weekly over-usage report
        .route("/weeks/{iso_year}/{iso_week}", get(handler::week_report))
        // One student's counters across weeks
        .route("/students/{student_id}", get(handler::student_history))
        // Single counter
        .route(
            "/students/{student_id}/weeks/{iso_year}/{iso_week}",
            get(handler::get_counter),
        )
        // Admin overrides
        .route(
            "/students/{student_id}/weeks/{iso_year}/{iso_week}/flag",
            post(handler::set_flag),
        )
        .route(
            "/students/{student_id}/weeks/{iso_year}/{iso_week}/extra-charge",
            post(handler::set_extra_charge),
        )
}
