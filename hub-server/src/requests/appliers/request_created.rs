//! RequestCreated event applier

use crate::requests::traits::EventApplier;
use shared::request::{EventPayload, RequestEvent, RequestSnapshot, SingleUseCode};

pub struct RequestCreatedApplier;

impl EventApplier for RequestCreatedApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent) {
        if let EventPayload::RequestCreated {
            student_id,
            clothes_type,
            pickup_slot_id,
            qr_code,
            notes,
            iso_year,
            iso_week,
            ..
        } = &event.payload
        {
            snapshot.student_id = student_id.clone();
            snapshot.clothes_type = *clothes_type;
            snapshot.pickup_slot_id = pickup_slot_id.clone();
            snapshot.qr_code = SingleUseCode::new(qr_code.clone());
            snapshot.notes = notes.clone();
            snapshot.iso_year = *iso_year;
            snapshot.iso_week = *iso_week;
            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
