//! Event Router - fan-out to the external collaborator channels
//!
//! Decouples the RequestManager from the notification and history
//! workers by giving each its own channel.
//!
//! ```text
//! RequestManager (broadcast)
//!        │
//!        └── EventRouter
//!               ├── mpsc ──► HistoryWorker (terminal events only) [CRITICAL]
//!               └── mpsc ──► NotifyWorker  (all events)           [best-effort]
//! ```
//!
//! ## Priority policy
//!
//! - **History**: terminal events become permanent audit records,
//!   blocking send so none is lost
//! - **Notify**: best-effort, dropped when the channel is full (a missed
//!   push notification must not block command processing)

use shared::request::{RequestEvent, RequestEventType};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Events that close a request's lifecycle (trigger the history record)
const TERMINAL_EVENTS: &[RequestEventType] = &[
    RequestEventType::DeliveryConfirmed,
    RequestEventType::RequestCancelled,
];

/// Channel receivers handed to the workers
pub struct EventChannels {
    /// History events (terminal only) - Arc-wrapped to avoid clones
    pub history_rx: mpsc::Receiver<Arc<RequestEvent>>,
    /// Notification events (all events)
    pub notify_rx: mpsc::Receiver<Arc<RequestEvent>>,
}

/// Event router
///
/// Subscribes to the manager's broadcast and dispatches to independent
/// mpsc channels by event type.
pub struct EventRouter {
    history_tx: mpsc::Sender<Arc<RequestEvent>>,
    notify_tx: mpsc::Sender<Arc<RequestEvent>>,
}

impl EventRouter {
    /// Create the router and its channels
    ///
    /// # Arguments
    /// - `history_buffer`: history channel buffer (critical, keep large)
    /// - `notify_buffer`: notification channel buffer (best-effort)
    pub fn new(history_buffer: usize, notify_buffer: usize) -> (Self, EventChannels) {
        let (history_tx, history_rx) = mpsc::channel(history_buffer);
        let (notify_tx, notify_rx) = mpsc::channel(notify_buffer);

        let router = Self {
            history_tx,
            notify_tx,
        };

        let channels = EventChannels {
            history_rx,
            notify_rx,
        };

        (router, channels)
    }

    /// Run the router until the source channel closes
    pub async fn run(self, mut source: broadcast::Receiver<RequestEvent>) {
        tracing::info!("Event router started");

        loop {
            match source.recv().await {
                Ok(event) => {
                    self.dispatch(event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Lag can drop terminal events before they reach the
                    // history channel
                    tracing::error!(
                        skipped = n,
                        "Event router lagged! Events skipped - history records may be lost"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Source channel closed, event router stopping");
                    break;
                }
            }
        }
    }

    /// Dispatch one event to its channels
    async fn dispatch(&self, event: RequestEvent) {
        let event = Arc::new(event);

        // 1. History channel first: blocking send, terminal events must
        // not be lost
        if TERMINAL_EVENTS.contains(&event.event_type)
            && self.history_tx.send(Arc::clone(&event)).await.is_err()
        {
            tracing::error!("History channel closed - audit records may be lost!");
        }

        // 2. Notification channel: best-effort, dropped when full
        match self.notify_tx.try_send(Arc::clone(&event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    request_id = %event.request_id,
                    event_type = ?event.event_type,
                    "Notify channel full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Notify channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::request::EventPayload;

    fn make_test_event(event_type: RequestEventType, sequence: u64) -> RequestEvent {
        let payload = match event_type {
            RequestEventType::DeliveryConfirmed => EventPayload::DeliveryConfirmed {},
            RequestEventType::RequestCancelled => EventPayload::RequestCancelled {
                released_slot_id: "slot-1".to_string(),
                iso_year: 2025,
                iso_week: 10,
            },
            _ => EventPayload::PickupConfirmed {},
        };

        RequestEvent::new(
            sequence,
            "req-1".to_string(),
            "admin-1".to_string(),
            "Front Desk".to_string(),
            uuid::Uuid::new_v4().to_string(),
            None,
            event_type,
            payload,
        )
    }

    #[tokio::test]
    async fn test_event_routing() {
        let (router, mut channels) = EventRouter::new(16, 16);
        let (tx, rx) = broadcast::channel(16);

        tokio::spawn(async move {
            router.run(rx).await;
        });

        // Non-terminal event reaches only the notify channel
        tx.send(make_test_event(RequestEventType::PickupConfirmed, 1))
            .unwrap();
        assert!(channels.notify_rx.recv().await.is_some());

        // Terminal event reaches both
        tx.send(make_test_event(RequestEventType::DeliveryConfirmed, 2))
            .unwrap();
        assert!(channels.notify_rx.recv().await.is_some());
        let archived = channels.history_rx.recv().await.unwrap();
        assert_eq!(archived.sequence, 2);
    }

    #[tokio::test]
    async fn test_history_unaffected_by_full_notify_channel() {
        let (router, mut channels) = EventRouter::new(16, 1); // notify buffer = 1
        let (tx, rx) = broadcast::channel(16);

        tokio::spawn(async move {
            router.run(rx).await;
        });

        // Fill the notify channel
        tx.send(make_test_event(RequestEventType::PickupConfirmed, 1))
            .unwrap();
        tx.send(make_test_event(RequestEventType::StatusAdvanced, 2))
            .unwrap();

        // Terminal event must still reach the history channel
        tx.send(make_test_event(RequestEventType::RequestCancelled, 3))
            .unwrap();

        let archived = channels.history_rx.recv().await;
        assert!(archived.is_some());
        assert_eq!(archived.unwrap().sequence, 3);
    }
}
