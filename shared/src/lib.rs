//! Shared types for the Laundry Hub service
//!
//! Common types used by the server and any client: request commands,
//! events, snapshots, pickup-slot and usage-counter models, and time
//! helpers.

pub mod models;
pub mod request;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
