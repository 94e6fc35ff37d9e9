//! Request Lifecycle Module
//!
//! This module implements the laundry request lifecycle using event
//! sourcing:
//!
//! - **manager**: Core RequestManager for command processing and event generation
//! - **storage**: redb-based persistence layer for events, snapshots, slots and counters
//! - **actions**: One command handler per lifecycle operation
//! - **appliers**: Pure event-to-snapshot folds
//! - **codes**: QR token and OTP generation
//!
//! # Architecture
//!
//! ```text
//! Command → RequestManager → Event → Storage (redb)
//!                 ↓                      ↓
//!              Broadcast          Snapshot Update
//!                 ↓
//!           All Subscribers
//! ```
//!
//! # Data Flow
//!
//! 1. Client sends RequestCommand via the HTTP API
//! 2. RequestManager validates and processes the command
//! 3. RequestEvent is generated with a global sequence
//! 4. Event, snapshot, slot and counter changes are committed atomically
//! 5. Event is broadcast to all subscribers
//! 6. CommandResponse is returned to the client

pub mod actions;
pub mod appliers;
pub mod codes;
pub mod manager;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::{ManagerError, ManagerResult, RequestManager};
pub use storage::RequestStorage;

// Re-export shared types for convenience
pub use shared::request::{
    CommandError, CommandErrorCode, CommandResponse, EventPayload, RequestCommand,
    RequestCommandPayload, RequestEvent, RequestEventType, RequestSnapshot, RequestStatus,
};
