//! API route modules
//!
//! # Structure
//!
//! - [`health`] - health check and component status
//! - [`requests`] - request lifecycle commands and queries
//! - [`slots`] - pickup slot administration
//! - [`usage`] - weekly usage reports and admin overrides
//!
//! Authentication and authorization sit in front of this server; handlers
//! trust the actor identity carried in the command envelope.

pub mod convert;

pub mod health;
pub mod requests;
pub mod slots;
pub mod usage;

use axum::Router;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build the application router with middleware and state
pub fn create_router(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    Router::new()
        .merge(health::router())
        .merge(requests::router())
        .merge(slots::router())
        .merge(usage::router())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
