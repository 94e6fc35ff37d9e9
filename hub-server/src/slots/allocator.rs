//! Administrative slot registry over the shared storage

use crate::requests::storage::{RequestStorage, StorageError};
use serde::Deserialize;
use shared::models::PickupSlot;
use thiserror::Error;

/// Slot administration errors
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("Pickup slot not found: {0}")]
    SlotNotFound(String),

    #[error("Capacity {capacity} below consumed count {consumed}")]
    CapacityBelowConsumed { capacity: u32, consumed: u32 },

    #[error("Slot {0} has {1} live reservation(s)")]
    SlotInUse(String, u32),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type SlotResult<T> = Result<T, SlotError>;

/// Scheduling data for a new slot
#[derive(Debug, Clone, Deserialize)]
pub struct NewSlot {
    pub hostel_block: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Window start (Unix millis)
    pub start_time: i64,
    /// Window end (Unix millis)
    pub end_time: i64,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub assigned_staff: Option<String>,
}

fn default_capacity() -> u32 {
    1
}

/// Partial update to an existing slot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotUpdate {
    pub capacity: Option<u32>,
    pub assigned_staff: Option<String>,
    pub is_active: Option<bool>,
}

/// Slot registry
///
/// Shares the request storage so admin edits and lifecycle reservations
/// see the same committed state.
#[derive(Clone)]
pub struct SlotAllocator {
    storage: RequestStorage,
}

impl SlotAllocator {
    pub fn new(storage: RequestStorage) -> Self {
        Self { storage }
    }

    /// Register a new slot with a fresh ID and zero consumption
    pub fn create_slot(&self, input: NewSlot) -> SlotResult<PickupSlot> {
        let now = shared::util::now_millis();
        let slot = PickupSlot {
            slot_id: uuid::Uuid::new_v4().to_string(),
            hostel_block: input.hostel_block,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            capacity: input.capacity,
            consumed_count: 0,
            assigned_staff: input.assigned_staff,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        self.storage.store_slot(&txn, &slot)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(slot_id = %slot.slot_id, capacity = slot.capacity, "Pickup slot created");
        Ok(slot)
    }

    /// Apply an administrative update
    ///
    /// Capacity can never be lowered below the current consumed count;
    /// existing reservations stay valid.
    pub fn update_slot(&self, slot_id: &str, update: SlotUpdate) -> SlotResult<PickupSlot> {
        let txn = self.storage.begin_write()?;
        let mut slot = self
            .storage
            .get_slot_txn(&txn, slot_id)?
            .ok_or_else(|| SlotError::SlotNotFound(slot_id.to_string()))?;

        if let Some(capacity) = update.capacity {
            if capacity < slot.consumed_count {
                return Err(SlotError::CapacityBelowConsumed {
                    capacity,
                    consumed: slot.consumed_count,
                });
            }
            slot.capacity = capacity;
        }
        if let Some(staff) = update.assigned_staff {
            slot.assigned_staff = Some(staff);
        }
        if let Some(is_active) = update.is_active {
            slot.is_active = is_active;
        }
        slot.updated_at = shared::util::now_millis();

        self.storage.store_slot(&txn, &slot)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(slot)
    }

    /// Remove a slot from the registry
    ///
    /// Rejected while any reservation is live; cancel or deliver the
    /// requests holding it first.
    pub fn delete_slot(&self, slot_id: &str) -> SlotResult<()> {
        let txn = self.storage.begin_write()?;
        let slot = self
            .storage
            .get_slot_txn(&txn, slot_id)?
            .ok_or_else(|| SlotError::SlotNotFound(slot_id.to_string()))?;

        if slot.consumed_count > 0 {
            return Err(SlotError::SlotInUse(
                slot_id.to_string(),
                slot.consumed_count,
            ));
        }

        self.storage.remove_slot(&txn, slot_id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(slot_id = %slot_id, "Pickup slot deleted");
        Ok(())
    }

    pub fn get_slot(&self, slot_id: &str) -> SlotResult<PickupSlot> {
        self.storage
            .get_slot(slot_id)?
            .ok_or_else(|| SlotError::SlotNotFound(slot_id.to_string()))
    }

    pub fn list_slots(&self) -> SlotResult<Vec<PickupSlot>> {
        Ok(self.storage.get_all_slots()?)
    }
}
