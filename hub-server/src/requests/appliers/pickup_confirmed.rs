//! PickupConfirmed event applier
//!
//! Consumes the QR pickup token and moves the request to PickedUp.

use crate::requests::traits::EventApplier;
use shared::request::{RequestEvent, RequestSnapshot, RequestStatus};

pub struct PickupConfirmedApplier;

impl EventApplier for PickupConfirmedApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent) {
        snapshot.status = RequestStatus::PickedUp;
        snapshot.qr_code.consume(event.timestamp);
        snapshot.pickup_time = Some(event.timestamp);
        snapshot.updated_at = event.timestamp;
        snapshot.last_sequence = event.sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::request::{EventPayload, RequestEventType, SingleUseCode};

    #[test]
    fn test_apply_pickup_confirmed() {
        let event = RequestEvent::new(
            2,
            "req-1".to_string(),
            "admin-1".to_string(),
            "Front Desk".to_string(),
            "cmd-2".to_string(),
            None,
            RequestEventType::PickupConfirmed,
            EventPayload::PickupConfirmed {},
        );

        let mut snapshot = RequestSnapshot::new("req-1".to_string());
        snapshot.qr_code = SingleUseCode::new("a1b2c3");

        PickupConfirmedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.status, RequestStatus::PickedUp);
        assert!(snapshot.qr_code.consumed);
        assert_eq!(snapshot.qr_code.consumed_at, Some(event.timestamp));
        assert_eq!(snapshot.pickup_time, Some(event.timestamp));
        assert_eq!(snapshot.last_sequence, 2);
    }
}
