//! ConfirmDelivery command handler
//!
//! Redeems the delivery OTP and moves the request Ready → Delivered.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::request::{EventPayload, RequestEvent, RequestEventType, RequestStatus};

/// ConfirmDelivery action
#[derive(Debug, Clone)]
pub struct ConfirmDeliveryAction {
    pub request_id: String,
    pub presented_otp: String,
    pub expected_status: RequestStatus,
}

#[async_trait]
impl CommandHandler for ConfirmDeliveryAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        let snapshot = ctx.load_snapshot(&self.request_id)?;

        // No OTP exists before the request reaches Ready
        let otp = snapshot.otp.as_ref().ok_or_else(|| {
            RequestError::InvalidTransition(format!(
                "Request {} has no delivery OTP issued (status {})",
                self.request_id, snapshot.status
            ))
        })?;

        if otp.consumed {
            return Err(RequestError::CodeAlreadyConsumed(format!(
                "Delivery OTP for request {} was already redeemed",
                self.request_id
            )));
        }

        if snapshot.status != self.expected_status {
            return Err(RequestError::ConcurrentConflict {
                expected: self.expected_status,
                actual: snapshot.status,
            });
        }

        if snapshot.status != RequestStatus::Ready {
            return Err(RequestError::InvalidTransition(format!(
                "Cannot confirm delivery for request {} in {} status",
                self.request_id, snapshot.status
            )));
        }

        if !otp.matches(&self.presented_otp) {
            return Err(RequestError::InvalidCode(format!(
                "Presented OTP does not match request {}",
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
            RequestEventType::DeliveryConfirmed,
            EventPayload::DeliveryConfirmed {},
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

    fn ready_snapshot(request_id: &str, otp: &str) -> RequestSnapshot {
        let mut snapshot = RequestSnapshot::new(request_id.to_string());
        snapshot.status = RequestStatus::Ready;
        snapshot.otp = Some(SingleUseCode::new(otp));
        snapshot
    }

    fn action(otp: &str, expected: RequestStatus) -> ConfirmDeliveryAction {
        ConfirmDeliveryAction {
            request_id: "req-1".to_string(),
            presented_otp: otp.to_string(),
            expected_status: expected,
        }
    }

    #[tokio::test]
    async fn test_confirm_delivery_success() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &ready_snapshot("req-1", "0420"))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = action("0420", RequestStatus::Ready)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, RequestEventType::DeliveryConfirmed);
    }

    #[tokio::test]
    async fn test_confirm_delivery_wrong_otp() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &ready_snapshot("req-1", "0420"))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("9999", RequestStatus::Ready)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::InvalidCode(_))));
    }

    #[tokio::test]
    async fn test_confirm_delivery_replay_reports_consumed() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = ready_snapshot("req-1", "0420");
        snapshot.status = RequestStatus::Delivered;
        if let Some(otp) = &mut snapshot.otp {
            otp.consume(1_700_000_000_000);
        }
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("0420", RequestStatus::Ready)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(result, Err(RequestError::CodeAlreadyConsumed(_))));
    }

    #[tokio::test]
    async fn test_confirm_delivery_before_ready() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = RequestSnapshot::new("req-1".to_string());
        snapshot.status = RequestStatus::Drying;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("0420", RequestStatus::Drying)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        // No OTP issued yet
        assert!(matches!(result, Err(RequestError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_confirm_delivery_stale_expected_status() {
        let storage = RequestStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &ready_snapshot("req-1", "0420"))
            .unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = action("0420", RequestStatus::Drying)
            .execute(&mut ctx, &create_test_metadata())
            .await;

        assert!(matches!(
            result,
            Err(RequestError::ConcurrentConflict { .. })
        ));
    }
}
