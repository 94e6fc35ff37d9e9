//! Core module - server configuration, state, wiring and errors
//!
//! # Module structure
//!
//! - [`Config`] - server configuration
//! - [`ServerState`] - shared service handles
//! - [`Server`] - HTTP server
//! - [`ServerError`] - API-level errors
//! - [`EventRouter`] - lifecycle event fan-out
//! - tasks - history and notification workers

pub mod config;
pub mod error;
pub mod event_router;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use event_router::{EventChannels, EventRouter};
pub use server::Server;
pub use state::ServerState;
