//! CancelRequest command handler
//!
//! Admin-only. Legal from Created and PickedUp; once washing starts the
//! request must run to completion. Cancellation releases the slot unit
//! and reverses the quota count in the same transaction as the status
//! change.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::models::WeekKey;
use shared::request::{EventPayload, RequestEvent, RequestEventType};

/// CancelRequest action
#[derive(Debug, Clone)]
pub struct CancelRequestAction {
    pub request_id: String,
    pub expected_status: shared::request::RequestStatus,
}

#[async_trait]
impl CommandHandler for CancelRequestAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        let snapshot = ctx.load_snapshot(&self.request_id)?;
        let now = shared::util::now_millis();

        // A terminal request is always InvalidTransition, even when the
        // caller's expected status is also stale.
        if snapshot.is_terminal() {
            return Err(RequestError::InvalidTransition(format!(
                "Request {} is already {}",
                self.request_id, snapshot.status
            )));
        }

        if snapshot.status != self.expected_status {
            return Err(RequestError::ConcurrentConflict {
                expected: self.expected_status,
                actual: snapshot.status,
            });
        }

        if !snapshot.status.can_cancel() {
            return Err(RequestError::InvalidTransition(format!(
                "Cannot cancel request {} in {} status",
                self.request_id, snapshot.status
            )));
        }

        // Release the slot unit. A slot deleted by an admin after the
        // reservation is not an error for the cancellation itself.
        match ctx.load_slot(&snapshot.pickup_slot_id) {
            Ok(mut slot) => {
                slot.consumed_count = slot.consumed_count.saturating_sub(1);
                slot.updated_at = now;
                ctx.save_slot(slot);
            }
            Err(RequestError::SlotNotFound(_)) => {
                tracing::warn!(
                    request_id = %self.request_id,
                    slot_id = %snapshot.pickup_slot_id,
                    "Slot missing on cancel, skipping release"
                );
            }
            Err(e) => return Err(e),
        }

        // Reverse the quota count in the week the request was created
        // in, not the current week.
        let key = WeekKey::new(
            snapshot.student_id.clone(),
            snapshot.iso_year,
            snapshot.iso_week,
        );
        let mut counter = ctx.load_or_init_counter(&key, now)?;
        counter.request_count = counter.request_count.saturating_sub(1);
        counter.updated_at = now;
        ctx.save_counter(counter);

        let seq = ctx.next_sequence();
        let event = RequestEvent::new(
            seq,
            self.request_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            RequestEventType::RequestCancelled,
            EventPayload::RequestCancelled {
                released_slot_id: snapshot.pickup_slot_id.clone(),
                iso_year: snapshot.iso_year,
                iso_week: snapshot.iso_week,
            },
        );

        Ok(vec![event])
    }
}
