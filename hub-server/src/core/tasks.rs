//! Background workers fed by the EventRouter
//!
//! Note: redb operations are synchronous for stability.

use crate::requests::storage::RequestStorage;
use shared::request::{EventPayload, RequestEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Arc-wrapped RequestEvent (from EventRouter)
type ArcRequestEvent = Arc<RequestEvent>;

/// Worker recording completed lifecycles for the history collaborator
///
/// Receives terminal events only (EventRouter filters). For each one it
/// loads the final snapshot and full event trail and hands the record to
/// the history sink.
pub struct HistoryWorker {
    storage: RequestStorage,
}

impl HistoryWorker {
    pub fn new(storage: RequestStorage) -> Self {
        Self { storage }
    }

    /// Run until the channel closes
    pub async fn run(self, mut event_rx: mpsc::Receiver<ArcRequestEvent>) {
        tracing::info!("HistoryWorker started");

        while let Some(event) = event_rx.recv().await {
            tracing::debug!(
                request_id = %event.request_id,
                event_type = ?event.event_type,
                "Received terminal event"
            );
            self.record_history(&event);
        }

        tracing::info!("History channel closed, shutting down HistoryWorker");
    }

    /// Hand one completed request over to the history record
    fn record_history(&self, event: &RequestEvent) {
        let snapshot = match self.storage.get_snapshot(&event.request_id) {
            Ok(Some(s)) => s,
            Ok(None) => {
                tracing::warn!(request_id = %event.request_id, "Snapshot missing for terminal event");
                return;
            }
            Err(e) => {
                tracing::error!(request_id = %event.request_id, error = %e, "Failed to load snapshot for history");
                return;
            }
        };

        let event_count = match self.storage.get_events_for_request(&event.request_id) {
            Ok(events) => events.len(),
            Err(e) => {
                tracing::error!(request_id = %event.request_id, error = %e, "Failed to load event trail for history");
                return;
            }
        };

        tracing::info!(
            request_id = %snapshot.request_id,
            student_id = %snapshot.student_id,
            final_status = %snapshot.status,
            event_count,
            created_at = snapshot.created_at,
            "Request recorded to history"
        );
    }
}

/// Worker dispatching student-facing notifications
///
/// Receives every event (best-effort channel). A dropped notification is
/// acceptable; a logged OTP is not - codes never appear in log output.
pub struct NotifyWorker;

impl NotifyWorker {
    pub fn new() -> Self {
        Self
    }

    /// Run until the channel closes
    pub async fn run(self, mut event_rx: mpsc::Receiver<ArcRequestEvent>) {
        tracing::info!("NotifyWorker started");

        while let Some(event) = event_rx.recv().await {
            self.dispatch(&event);
        }

        tracing::info!("Notify channel closed, shutting down NotifyWorker");
    }

    fn dispatch(&self, event: &RequestEvent) {
        let Some(message) = notification_for(event) else {
            return;
        };

        // Delivery transport (push/SMS) sits behind the campus gateway;
        // here we record the dispatch only.
        tracing::info!(
            request_id = %event.request_id,
            event_type = ?event.event_type,
            message,
            "Notification dispatched"
        );
    }
}

impl Default for NotifyWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// Student-facing message for one event, None when nothing is sent.
///
/// The Ready event carries the delivery OTP; the message says a code was
/// issued but never contains the code itself.
fn notification_for(event: &RequestEvent) -> Option<String> {
    match &event.payload {
        EventPayload::RequestCreated { pickup_slot_id, .. } => Some(format!(
            "Laundry request registered. Show your QR code at pickup slot {pickup_slot_id}."
        )),
        EventPayload::PickupConfirmed {} => {
            Some("Your laundry has been picked up.".to_string())
        }
        EventPayload::StatusAdvanced { to, otp, .. } => {
            if otp.is_some() {
                Some(
                    "Your laundry is ready. A delivery code has been sent to you separately."
                        .to_string(),
                )
            } else {
                Some(format!("Your laundry is now {to}."))
            }
        }
        EventPayload::DeliveryConfirmed {} => {
            Some("Your laundry has been delivered. Thank you!".to_string())
        }
        EventPayload::RequestCancelled { .. } => {
            Some("Your laundry request has been cancelled.".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::request::{RequestEventType, RequestStatus};

    fn make_event(event_type: RequestEventType, payload: EventPayload) -> RequestEvent {
        RequestEvent::new(
            1,
            "req-1".to_string(),
            "stu-1".to_string(),
            "Student One".to_string(),
            uuid::Uuid::new_v4().to_string(),
            None,
            event_type,
            payload,
        )
    }

    #[test]
    fn test_ready_notification_never_contains_otp() {
        let event = make_event(
            RequestEventType::StatusAdvanced,
            EventPayload::StatusAdvanced {
                from: RequestStatus::Drying,
                to: RequestStatus::Ready,
                otp: Some("4217".to_string()),
            },
        );

        let message = notification_for(&event).unwrap();
        assert!(!message.contains("4217"));
        assert!(message.contains("ready"));
    }

    #[test]
    fn test_intermediate_advance_names_the_status() {
        let event = make_event(
            RequestEventType::StatusAdvanced,
            EventPayload::StatusAdvanced {
                from: RequestStatus::PickedUp,
                to: RequestStatus::Washing,
                otp: None,
            },
        );

        let message = notification_for(&event).unwrap();
        assert!(message.contains("WASHING"));
    }
}
