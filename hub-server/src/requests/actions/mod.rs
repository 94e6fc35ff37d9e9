//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::requests::traits::{CommandContext, CommandHandler, CommandMetadata, RequestError};
use shared::request::{RequestCommand, RequestCommandPayload, RequestEvent};

mod advance_status;
mod cancel_request;
mod confirm_delivery;
mod confirm_pickup;
pub mod create_request;

pub use advance_status::AdvanceStatusAction;
pub use cancel_request::CancelRequestAction;
pub use confirm_delivery::ConfirmDeliveryAction;
pub use confirm_pickup::ConfirmPickupAction;
pub use create_request::CreateRequestAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    CreateRequest(CreateRequestAction),
    ConfirmPickup(ConfirmPickupAction),
    AdvanceStatus(AdvanceStatusAction),
    ConfirmDelivery(ConfirmDeliveryAction),
    CancelRequest(CancelRequestAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError> {
        match self {
            CommandAction::CreateRequest(action) => action.execute(ctx, metadata).await,
            CommandAction::ConfirmPickup(action) => action.execute(ctx, metadata).await,
            CommandAction::AdvanceStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::ConfirmDelivery(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelRequest(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert RequestCommand to CommandAction
///
/// This is the ONLY place with a match on RequestCommandPayload.
/// CreateRequest and AdvanceStatus-to-Ready are handled in the manager
/// because they need pre-generated IDs/codes.
impl From<&RequestCommand> for CommandAction {
    fn from(cmd: &RequestCommand) -> Self {
        match &cmd.payload {
            RequestCommandPayload::CreateRequest { .. } => {
                unreachable!("CreateRequest is built by RequestManager with pre-generated codes")
            }
            RequestCommandPayload::ConfirmPickup {
                request_id,
                presented_code,
                expected_status,
            } => CommandAction::ConfirmPickup(ConfirmPickupAction {
                request_id: request_id.clone(),
                presented_code: presented_code.clone(),
                expected_status: *expected_status,
            }),
            RequestCommandPayload::AdvanceStatus {
                request_id,
                target_status,
                expected_status,
            } => CommandAction::AdvanceStatus(AdvanceStatusAction {
                request_id: request_id.clone(),
                target_status: *target_status,
                expected_status: *expected_status,
                otp: None, // OTP is injected by RequestManager when entering Ready
            }),
            RequestCommandPayload::ConfirmDelivery {
                request_id,
                presented_otp,
                expected_status,
            } => CommandAction::ConfirmDelivery(ConfirmDeliveryAction {
                request_id: request_id.clone(),
                presented_otp: presented_otp.clone(),
                expected_status: *expected_status,
            }),
            RequestCommandPayload::CancelRequest {
                request_id,
                expected_status,
            } => CommandAction::CancelRequest(CancelRequestAction {
                request_id: request_id.clone(),
                expected_status: *expected_status,
            }),
        }
    }
}
