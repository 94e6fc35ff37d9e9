//! Request snapshot - current state of one laundry request
//!
//! The snapshot is computed from the request's event stream and cached
//! in storage. Verification codes are embedded as consume-once fields so
//! that redeeming them is subject to the same transactional guard as the
//! status transition they drive.

use serde::{Deserialize, Serialize};

/// Laundry request status
///
/// The only legal moves are forward along
/// `Created → PickedUp → Washing → Drying → Ready → Delivered`,
/// plus `Cancelled` from `Created` or `PickedUp`. Status never regresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Created,
    PickedUp,
    Washing,
    Drying,
    Ready,
    Delivered,
    Cancelled,
}

impl RequestStatus {
    /// Terminal states are retained for audit history and accept no
    /// further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Delivered | RequestStatus::Cancelled)
    }

    /// Whether `self → target` is one of the manual progress edges
    /// (`PickedUp→Washing`, `Washing→Drying`, `Drying→Ready`).
    ///
    /// Pickup, delivery, and cancellation are NOT manual edges; they go
    /// through their own code-gated or admin-gated operations.
    pub fn can_advance_to(self, target: RequestStatus) -> bool {
        matches!(
            (self, target),
            (RequestStatus::PickedUp, RequestStatus::Washing)
                | (RequestStatus::Washing, RequestStatus::Drying)
                | (RequestStatus::Drying, RequestStatus::Ready)
        )
    }

    /// Cancellation window: only before the wash cycle starts.
    pub fn can_cancel(self) -> bool {
        matches!(self, RequestStatus::Created | RequestStatus::PickedUp)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Created => write!(f, "CREATED"),
            RequestStatus::PickedUp => write!(f, "PICKED_UP"),
            RequestStatus::Washing => write!(f, "WASHING"),
            RequestStatus::Drying => write!(f, "DRYING"),
            RequestStatus::Ready => write!(f, "READY"),
            RequestStatus::Delivered => write!(f, "DELIVERED"),
            RequestStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A single-use verification code bound to one request
///
/// The value is compared against whatever the admin presents; once it
/// matches, `consumed` flips and stays set, so a replay of the same code
/// is detectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SingleUseCode {
    /// Opaque code value (hex token for QR, 4 digits for OTP)
    pub value: String,
    /// Whether the code has already been redeemed
    #[serde(default)]
    pub consumed: bool,
    /// When the code was redeemed (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<i64>,
}

impl SingleUseCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            consumed: false,
            consumed_at: None,
        }
    }

    /// Compare against a presented code. Consumption state is checked
    /// separately so replays can be reported distinctly.
    pub fn matches(&self, presented: &str) -> bool {
        self.value == presented
    }

    /// Mark the code spent at the given timestamp.
    pub fn consume(&mut self, at: i64) {
        self.consumed = true;
        self.consumed_at = Some(at);
    }
}

/// Clothes type selected at submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClothesType {
    #[default]
    Normal,
    Urgent,
}

/// Request snapshot - computed from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestSnapshot {
    /// Request ID (assigned by server at creation)
    pub request_id: String,
    /// Requesting student
    pub student_id: String,
    /// Clothes type (immutable after creation)
    pub clothes_type: ClothesType,
    /// Current lifecycle status
    pub status: RequestStatus,
    /// Reserved pickup slot (immutable after creation)
    pub pickup_slot_id: String,
    /// QR pickup token, generated at creation, consumed at pickup
    pub qr_code: SingleUseCode,
    /// Delivery OTP, absent until the request enters Ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<SingleUseCode>,
    /// Free-form student notes, opaque to the lifecycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// ISO week the request was created in (quota bucket)
    pub iso_year: i32,
    pub iso_week: u32,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Stamped by ConfirmPickup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<i64>,
    /// Stamped by ConfirmDelivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<i64>,
    /// Last update timestamp
    pub updated_at: i64,
    /// Last applied event sequence
    pub last_sequence: u64,
}

impl RequestSnapshot {
    /// Create an empty snapshot; fields are filled in by the
    /// RequestCreated applier.
    pub fn new(request_id: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            request_id,
            student_id: String::new(),
            clothes_type: ClothesType::Normal,
            status: RequestStatus::Created,
            pickup_slot_id: String::new(),
            qr_code: SingleUseCode::default(),
            otp: None,
            notes: None,
            iso_year: 0,
            iso_week: 0,
            created_at: now,
            pickup_time: None,
            delivery_time: None,
            updated_at: now,
            last_sequence: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
