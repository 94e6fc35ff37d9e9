//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use crate::requests::traits::EventApplier;
use shared::request::{EventPayload, RequestEvent, RequestSnapshot};

mod delivery_confirmed;
mod pickup_confirmed;
mod request_cancelled;
mod request_created;
mod status_advanced;

pub use delivery_confirmed::DeliveryConfirmedApplier;
pub use pickup_confirmed::PickupConfirmedApplier;
pub use request_cancelled::RequestCancelledApplier;
pub use request_created::RequestCreatedApplier;
pub use status_advanced::StatusAdvancedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    RequestCreated(RequestCreatedApplier),
    PickupConfirmed(PickupConfirmedApplier),
    StatusAdvanced(StatusAdvancedApplier),
    DeliveryConfirmed(DeliveryConfirmedApplier),
    RequestCancelled(RequestCancelledApplier),
}

/// Convert RequestEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&RequestEvent> for EventAction {
    fn from(event: &RequestEvent) -> Self {
        match &event.payload {
            EventPayload::RequestCreated { .. } => {
                EventAction::RequestCreated(RequestCreatedApplier)
            }
            EventPayload::PickupConfirmed {} => {
                EventAction::PickupConfirmed(PickupConfirmedApplier)
            }
            EventPayload::StatusAdvanced { .. } => {
                EventAction::StatusAdvanced(StatusAdvancedApplier)
            }
            EventPayload::DeliveryConfirmed {} => {
                EventAction::DeliveryConfirmed(DeliveryConfirmedApplier)
            }
            EventPayload::RequestCancelled { .. } => {
                EventAction::RequestCancelled(RequestCancelledApplier)
            }
        }
    }
}

/// Rebuild a snapshot by folding events in sequence order
pub fn replay(request_id: &str, events: &[RequestEvent]) -> RequestSnapshot {
    let mut snapshot = RequestSnapshot::new(request_id.to_string());
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    snapshot
}
