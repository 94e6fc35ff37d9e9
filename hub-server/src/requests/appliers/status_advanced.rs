//! StatusAdvanced event applier
//!
//! Moves the request along a manual progress edge. Entering Ready
//! installs the delivery OTP carried in the payload.

use crate::requests::traits::EventApplier;
use shared::request::{EventPayload, RequestEvent, RequestSnapshot, SingleUseCode};

pub struct StatusAdvancedApplier;

impl EventApplier for StatusAdvancedApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent) {
        if let EventPayload::StatusAdvanced { to, otp, .. } = &event.payload {
            snapshot.status = *to;
            if let Some(otp) = otp {
                snapshot.otp = Some(SingleUseCode::new(otp.clone()));
            }
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
