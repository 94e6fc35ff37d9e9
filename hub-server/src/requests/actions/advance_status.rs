//! AdvanceStatus command handler
//!
//! Handles the manual progress edges PickedUp→Washing, Washing→Drying
//! and Drying→Ready. Entering Ready issues the delivery OTP, which the
//! manager pre-generates before the transaction opens.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::request::{EventPayload, RequestEvent, RequestEventType, RequestStatus};

/// AdvanceStatus action
#[derive(Debug, Clone)]
pub struct AdvanceStatusAction {
    pub request_id: String,
    pub target_status: RequestStatus,
    pub expected_status: RequestStatus,
    /// Pre-generated OTP, set by the manager when target is Ready
    pub otp: Option<String>,
}

#[async_trait]
impl CommandHandler for AdvanceStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        let snapshot = ctx.load_snapshot(&self.request_id)?;

        if snapshot.status != self.expected_status {
            return Err(RequestError::ConcurrentConflict {
                expected: self.expected_status,
                actual: snapshot.status,
            });
        }

        if !snapshot.status.can_advance_to(self.target_status) {
            return Err(RequestError::InvalidTransition(format!(
                "Cannot advance request {} from {} to {}",
                self.request_id, snapshot.status, self.target_status
            )));
        }

        let otp = if self.target_status == RequestStatus::Ready {
            Some(self.otp.clone().ok_or_else(|| {
                RequestError::Internal(
                    "OTP must be pre-generated when advancing to Ready".to_string(),
                )
            })?)
        } else {
            None
        };

        let seq = ctx.next_sequence();
        let event = RequestEvent::new(
            seq,
            self.request_id.clone(),
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            RequestEventType::StatusAdvanced,
            EventPayload::StatusAdvanced {
                from: snapshot.status,
                to: self.target_status,
                otp,
            },
        );

        Ok(vec![event])
    }
}
