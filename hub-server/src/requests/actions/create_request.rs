//! CreateRequest command handler
//!
//! Reserves a pickup slot unit, counts the request against the
//! student's weekly quota, and emits RequestCreated. Slot, counter, and
//! request all change in the same transaction, so a failed creation
//! leaves no partial reservation behind.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::models::WeekKey;
use shared::request::{ClothesType, EventPayload, RequestEvent, RequestEventType};

/// CreateRequest action
///
/// `request_id` and `qr_code` are pre-generated by the manager before
/// the transaction opens.
#[derive(Debug, Clone)]
pub struct CreateRequestAction {
    pub request_id: String,
    pub student_id: String,
    pub clothes_type: ClothesType,
    pub pickup_slot_id: String,
    pub notes: Option<String>,
    pub qr_code: String,
    /// Free weekly allowance (from config)
    pub free_limit: u32,
    /// Charge accrued per over-allowance request (₹, from config)
    pub extra_charge: u32,
}

#[async_trait]
impl CommandHandler for CreateRequestAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        let now = shared::util::now_millis();

        // 1. Reserve a slot unit. Capacity is checked and consumed inside
        // the same write transaction, so two concurrent creations can
        // never both take the last unit.
        let mut slot = ctx.load_slot(&self.pickup_slot_id)?;
        if !slot.has_capacity() {
            return Err(RequestError::SlotUnavailable(format!(
                "Slot {} has no remaining capacity ({}/{})",
                self.pickup_slot_id, slot.consumed_count, slot.capacity
            )));
        }
        slot.consumed_count += 1;
        slot.updated_at = now;
        ctx.save_slot(slot);

        // 2. Count against the weekly quota. Exceeding the allowance
        // never blocks; it accrues an extra charge and is surfaced to
        // admins through the event.
        let key = WeekKey::from_millis(self.student_id.clone(), now);
        let mut counter = ctx.load_or_init_counter(&key, now)?;
        counter.request_count += 1;
        let exceeds_allowance = counter.exceeds_allowance(self.free_limit);
        if exceeds_allowance {
            counter.extra_charges += self.extra_charge;
        }
        counter.updated_at = now;
        let request_count = counter.request_count;
        ctx.save_counter(counter);

        // 3. Emit the creation event
        let seq = ctx.next_sequence();
        let event = RequestEvent::new(
            seq,
            self.request_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            RequestEventType::RequestCreated,
            EventPayload::RequestCreated {
                student_id: self.student_id.clone(),
                clothes_type: self.clothes_type,
                pickup_slot_id: self.pickup_slot_id.clone(),
                qr_code: self.qr_code.clone(),
                notes: self.notes.clone(),
                iso_year: key.iso_year,
                iso_week: key.iso_week,
                request_count,
                exceeds_allowance,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::storage::RequestStorage;
    use crate::requests::traits::CommandContext;
    use shared::models::{PickupSlot, UsageCounter};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "stu-1".to_string(),
            actor_name: "Test Student".to_string(),
            timestamp: 1234567890,
        }
    }

    fn create_test_slot(slot_id: &str, capacity: u32, consumed: u32) -> PickupSlot {
        PickupSlot {
            slot_id: slot_id.to_string(),
            hostel_block: "B".to_string(),
            date: "2025-03-05".to_string(),
            start_time: 0,
            end_time: 3_600_000,
            capacity,
            consumed_count: consumed,
            assigned_staff: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn create_action(slot_id: &str) -> CreateRequestAction {
        CreateRequestAction {
            request_id: "req-1".to_string(),
            student_id: "stu-1".to_string(),
            clothes_type: ClothesType::Normal,
            pickup_slot_id: slot_id.to_string(),
            notes: None,
            qr_code: "deadbeef".to_string(),
            free_limit: 2,
            extra_charge: 10,
        }
    }

    #[tokio::test]
    async fn test_create_reserves_slot_and_counts_usage() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_slot(&txn, &create_test_slot("slot-1", 2, 0))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = create_action("slot-1")
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[0].event_type, RequestEventType::RequestCreated);

        let slot = ctx.modified_slots().next().unwrap();
        assert_eq!(slot.consumed_count, 1);

        let counter = ctx.modified_counters().next().unwrap();
        assert_eq!(counter.request_count, 1);
        assert_eq!(counter.extra_charges, 0);

        if let EventPayload::RequestCreated {
            qr_code,
            request_count,
            exceeds_allowance,
            ..
        } = &events[0].payload
        {
            assert_eq!(qr_code, "deadbeef");
            assert_eq!(*request_count, 1);
            assert!(!exceeds_allowance);
        } else {
            panic!("Expected RequestCreated payload");
        }
    }

    #[tokio::test]
    async fn test_create_rejects_full_slot() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_slot(&txn, &create_test_slot("slot-1", 1, 1))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = create_action("slot-1")
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::SlotUnavailable(_))));
        // Nothing buffered on rejection
        assert_eq!(ctx.modified_slots().count(), 0);
        assert_eq!(ctx.modified_counters().count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_slot() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut slot = create_test_slot("slot-1", 2, 0);
        slot.is_active = false;
        storage.store_slot(&txn, &slot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = create_action("slot-1")
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::SlotUnavailable(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_slot() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = create_action("nope")
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::SlotNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_over_allowance_accrues_charge_without_blocking() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_slot(&txn, &create_test_slot("slot-1", 10, 0))
            .unwrap();

        // Seed counter at the limit for the current week
        let now = shared::util::now_millis();
        let key = WeekKey::from_millis("stu-1", now);
        let mut counter = UsageCounter::new(&key, now);
        counter.request_count = 2;
        storage.store_counter(&txn, &counter).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = create_action("slot-1")
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::RequestCreated {
            request_count,
            exceeds_allowance,
            ..
        } = &events[0].payload
        {
            assert_eq!(*request_count, 3);
            assert!(exceeds_allowance);
        } else {
            panic!("Expected RequestCreated payload");
        }

        let counter = ctx.modified_counters().next().unwrap();
        assert_eq!(counter.request_count, 3);
        assert_eq!(counter.extra_charges, 10);
    }
}
