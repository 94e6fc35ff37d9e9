//! ConfirmPickup command handler
//!
//! Redeems the request's QR token and moves it Created → PickedUp.
//! Check order matters: a spent code must report CodeAlreadyConsumed
//! even when the presented code would otherwise be wrong for the
//! current state.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::request::{EventPayload, RequestEvent, RequestEventType, RequestStatus};

/// ConfirmPickup action
#[derive(Debug, Clone)]
pub struct ConfirmPickupAction {
    pub request_id: String,
    pub presented_code: String,
    pub expected_status: RequestStatus,
}

#[async_trait]
impl CommandHandler for ConfirmPickupAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        let snapshot = ctx.load_snapshot(&self.request_id)?;

        // 1. Replay detection before anything else
        if snapshot.qr_code.consumed {
            return Err(RequestError::CodeAlreadyConsumed(format!(
                "QR code for request {} was already redeemed",
                self.request_id
            )));
        }

        // 2. Guard against a stale precondition
        if snapshot.status != self.expected_status {
            return Err(RequestError::ConcurrentConflict {
                expected: self.expected_status,
                actual: snapshot.status,
            });
        }

        // 3. Pickup is only legal from Created
        if snapshot.status != RequestStatus::Created {
            return Err(RequestError::InvalidTransition(format!(
                "Cannot confirm pickup for request {} in {} status",
                self.request_id, snapshot.status
            )));
        }

        // 4. Verify the presented code
        if !snapshot.qr_code.matches(&self.presented_code) {
            return Err(RequestError::InvalidCode(format!(
                "Presented code does not match request {}",
                self.request_id
            )));
        }

        let seq = ctx.next_sequence();
        let event = RequestEvent::new(
            seq,
            self.request_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            RequestEventType::PickupConfirmed,
            EventPayload::PickupConfirmed {},
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::storage::RequestStorage;
    use crate::requests::traits::CommandContext;
    use shared::request::{RequestSnapshot, SingleUseCode};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "admin-1".to_string(),
            actor_name: "Front Desk".to_string(),
            timestamp: 1234567890,
        }
    }

    fn create_snapshot(request_id: &str, code: &str) -> RequestSnapshot {
        let mut snapshot = RequestSnapshot::new(request_id.to_string());
        snapshot.status = RequestStatus::Created;
        snapshot.qr_code = SingleUseCode::new(code);
        snapshot
    }

    fn action(code: &str, expected: RequestStatus) -> ConfirmPickupAction {
        ConfirmPickupAction {
            request_id: "req-1".to_string(),
            presented_code: code.to_string(),
            expected_status: expected,
        }
    }

    #[tokio::test]
    async fn test_confirm_pickup_success() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &create_snapshot("req-1", "abc123"))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 5);
        let events = action("abc123", RequestStatus::Created)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 6);
        assert_eq!(events[0].event_type, RequestEventType::PickupConfirmed);
    }

    #[tokio::test]
    async fn test_confirm_pickup_wrong_code() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &create_snapshot("req-1", "abc123"))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("wrong", RequestStatus::Created)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::InvalidCode(_))));
    }

    #[tokio::test]
    async fn test_confirm_pickup_replay_reports_consumed() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = create_snapshot("req-1", "abc123");
        snapshot.qr_code.consume(1_700_000_000_000);
        snapshot.status = RequestStatus::PickedUp;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        // Even with the stale expected status, the replay wins
        let result = action("abc123", RequestStatus::Created)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::CodeAlreadyConsumed(_))));
    }

    #[tokio::test]
    async fn test_confirm_pickup_stale_expected_status() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = create_snapshot("req-1", "abc123");
        snapshot.status = RequestStatus::Cancelled;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("abc123", RequestStatus::Created)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(
            result,
            Err(RequestError::ConcurrentConflict {
                expected: RequestStatus::Created,
                actual: RequestStatus::Cancelled,
            })
        ));
    }

    #[tokio::test]
    async fn test_confirm_pickup_nonexistent_request() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("abc123", RequestStatus::Created)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::RequestNotFound(_))));
    }
}
