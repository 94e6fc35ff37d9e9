//! Pickup slot - a bounded collection window

use serde::{Deserialize, Serialize};

/// A pickup slot with bounded capacity
///
/// `consumed_count` only moves through reserve/release inside a storage
/// write transaction, so `consumed_count <= capacity` holds at all times
/// and a full slot rejects further reservations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupSlot {
    /// Slot ID (assigned by server at creation)
    pub slot_id: String,
    /// Hostel block this slot serves
    pub hostel_block: String,
    /// Calendar date of the window (YYYY-MM-DD)
    pub date: String,
    /// Window start, Unix millis
    pub start_time: i64,
    /// Window end, Unix millis
    pub end_time: i64,
    /// Maximum concurrent reservations
    pub capacity: u32,
    /// Currently held reservations
    pub consumed_count: u32,
    /// Staff member assigned to collect from this slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_staff: Option<String>,
    /// Inactive slots are hidden from students but keep their
    /// reservations until those requests finish or cancel
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PickupSlot {
    pub fn has_capacity(&self) -> bool {
        self.is_active && self.consumed_count < self.capacity
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.consumed_count)
    }
}
