//! Request events - immutable facts recorded after command processing

use super::snapshot::{ClothesType, RequestStatus};
use serde::{Deserialize, Serialize};

/// Request event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (authoritative ordering for replay)
    pub sequence: u64,
    /// Request this event belongs to
    pub request_id: String,
    /// Server timestamp (Unix millis) - authoritative for state evolution
    pub timestamp: i64,
    /// Client timestamp - audit only, may differ due to clock skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Actor who triggered this event
    pub actor_id: String,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Command that triggered this event
    pub command_id: String,
    /// Event type
    pub event_type: RequestEventType,
    /// Event payload
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestEventType {
    RequestCreated,
    PickupConfirmed,
    StatusAdvanced,
    DeliveryConfirmed,
    RequestCancelled,
}

impl std::fmt::Display for RequestEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestEventType::RequestCreated => write!(f, "REQUEST_CREATED"),
            RequestEventType::PickupConfirmed => write!(f, "PICKUP_CONFIRMED"),
            RequestEventType::StatusAdvanced => write!(f, "STATUS_ADVANCED"),
            RequestEventType::DeliveryConfirmed => write!(f, "DELIVERY_CONFIRMED"),
            RequestEventType::RequestCancelled => write!(f, "REQUEST_CANCELLED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    RequestCreated {
        student_id: String,
        clothes_type: ClothesType,
        pickup_slot_id: String,
        /// QR pickup token generated for this request
        qr_code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        /// Quota bucket the creation was counted in
        iso_year: i32,
        iso_week: u32,
        /// Student's request count in that bucket after this creation
        request_count: u32,
        /// Informational: count is beyond the free weekly allowance.
        /// Never blocks creation.
        exceeds_allowance: bool,
    },

    PickupConfirmed {},

    StatusAdvanced {
        from: RequestStatus,
        to: RequestStatus,
        /// Present only when `to` is Ready. Carried so the notification
        /// dispatcher can deliver it to the student out of band.
        #[serde(skip_serializing_if = "Option::is_none")]
        otp: Option<String>,
    },

    DeliveryConfirmed {},

    RequestCancelled {
        /// Slot whose capacity unit was returned
        released_slot_id: String,
        /// Quota bucket the reversal was applied to
        iso_year: i32,
        iso_week: u32,
    },
}

impl RequestEvent {
    /// Create a new event. The server timestamp is always set here; the
    /// client timestamp is preserved for audit only.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        request_id: String,
        actor_id: String,
        actor_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: RequestEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            request_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            client_timestamp,
            actor_id,
            actor_name,
            command_id,
            event_type,
            payload,
        }
    }

    /// Terminal events close a request's lifecycle and feed the external
    /// order-history collaborator.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.event_type,
            RequestEventType::DeliveryConfirmed | RequestEventType::RequestCancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_sets_server_timestamp() {
        let before = chrono::Utc::now().timestamp_millis();
        let event = RequestEvent::new(
            1,
            "req-1".to_string(),
            "admin-1".to_string(),
            "Admin".to_string(),
            "cmd-1".to_string(),
            Some(42),
            RequestEventType::PickupConfirmed,
            EventPayload::PickupConfirmed {},
        );
        assert!(event.timestamp >= before);
        assert_eq!(event.client_timestamp, Some(42));
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_terminal_classification() {
        let mk = |event_type, payload| {
            RequestEvent::new(
                1,
                "req-1".to_string(),
                "a".to_string(),
                "A".to_string(),
                "c".to_string(),
                None,
                event_type,
                payload,
            )
        };
        assert!(mk(
            RequestEventType::DeliveryConfirmed,
            EventPayload::DeliveryConfirmed {}
        )
        .is_terminal());
        assert!(mk(
            RequestEventType::RequestCancelled,
            EventPayload::RequestCancelled {
                released_slot_id: "slot-1".to_string(),
                iso_year: 2025,
                iso_week: 10,
            }
        )
        .is_terminal());
        assert!(!mk(
            RequestEventType::PickupConfirmed,
            EventPayload::PickupConfirmed {}
        )
        .is_terminal());
    }
}
