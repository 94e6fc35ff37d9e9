//! DeliveryConfirmed event applier
//!
//! Consumes the delivery OTP and closes the lifecycle at Delivered.

use crate::requests::traits::EventApplier;
use shared::request::{RequestEvent, RequestSnapshot, RequestStatus};

pub struct DeliveryConfirmedApplier;

impl EventApplier for DeliveryConfirmedApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent) {
        snapshot.status = RequestStatus::Delivered;
        if let Some(otp) = &mut snapshot.otp {
            otp.consume(event.timestamp);
        }
        snapshot.delivery_time = Some(event.timestamp);
        snapshot.updated_at = event.timestamp;
        snapshot.last_sequence = event.sequence;
    }
}
