//! Laundry request types: commands, events, snapshots
//!
//! The request lifecycle is command-driven: clients submit a
//! [`RequestCommand`], the server validates it against the current
//! [`RequestSnapshot`] and records one or more [`RequestEvent`]s.

pub mod event;
pub mod snapshot;
pub mod types;

pub use event::{EventPayload, RequestEvent, RequestEventType};
pub use snapshot::{ClothesType, RequestSnapshot, RequestStatus, SingleUseCode};
pub use types::{
    CommandError, CommandErrorCode, CommandResponse, RequestCommand, RequestCommandPayload,
};
