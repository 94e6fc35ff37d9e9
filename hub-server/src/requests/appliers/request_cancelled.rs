//! RequestCancelled event applier
//!
//! Slot release and quota reversal happen in the command handler; the
//! applier only records the terminal status on the snapshot.

use crate::requests::traits::EventApplier;
use shared::request::{RequestEvent, RequestSnapshot, RequestStatus};

pub struct RequestCancelledApplier;

impl EventApplier for RequestCancelledApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent) {
        snapshot.status = RequestStatus::Cancelled;
        snapshot.updated_at = event.timestamp;
        snapshot.last_sequence = event.sequence;
    }
}
