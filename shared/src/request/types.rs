//! Shared command/response types for the request lifecycle

use super::snapshot::{ClothesType, RequestStatus};
use serde::{Deserialize, Serialize};

/// Command envelope submitted by a client
///
/// `command_id` is the idempotency key: replays of an already-processed
/// command succeed without re-applying anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCommand {
    /// Client-generated unique command ID (idempotency key)
    pub command_id: String,
    /// Acting identity (student for CreateRequest, admin otherwise),
    /// already resolved by the external auth layer
    pub actor_id: String,
    /// Actor display name (snapshot for audit)
    pub actor_name: String,
    /// Client timestamp (Unix millis) - audit only, may have clock skew
    pub timestamp: i64,
    /// Operation payload
    pub payload: RequestCommandPayload,
}

impl RequestCommand {
    /// Build a command with a fresh command ID and the current client
    /// timestamp.
    pub fn new(actor_id: String, actor_name: String, payload: RequestCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            actor_id,
            actor_name,
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }
}

/// Command payload variants, one per lifecycle operation
///
/// Every transition payload carries `expected_status`: the status the
/// caller last observed. If the stored status differs, the command fails
/// with `ConcurrentConflict` instead of applying against a stale
/// precondition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestCommandPayload {
    CreateRequest {
        student_id: String,
        clothes_type: ClothesType,
        pickup_slot_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    ConfirmPickup {
        request_id: String,
        /// Decoded QR payload from the external capture device
        presented_code: String,
        expected_status: RequestStatus,
    },
    AdvanceStatus {
        request_id: String,
        target_status: RequestStatus,
        expected_status: RequestStatus,
    },
    ConfirmDelivery {
        request_id: String,
        /// 4-digit OTP entered by the admin
        presented_otp: String,
        expected_status: RequestStatus,
    },
    CancelRequest {
        request_id: String,
        expected_status: RequestStatus,
    },
}

impl RequestCommandPayload {
    /// Request this command targets (None for CreateRequest, which
    /// assigns a fresh ID).
    pub fn request_id(&self) -> Option<&str> {
        match self {
            RequestCommandPayload::CreateRequest { .. } => None,
            RequestCommandPayload::ConfirmPickup { request_id, .. }
            | RequestCommandPayload::AdvanceStatus { request_id, .. }
            | RequestCommandPayload::ConfirmDelivery { request_id, .. }
            | RequestCommandPayload::CancelRequest { request_id, .. } => Some(request_id),
        }
    }
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Affected request ID (the new ID for CreateRequest)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, request_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            request_id,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            request_id: None,
            error: Some(error),
        }
    }

    /// Response for a replayed command that was already processed
    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            request_id: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    RequestNotFound,
    SlotNotFound,
    /// Requested state change is not an edge of the transition graph
    InvalidTransition,
    /// Presented QR/OTP does not match the stored value
    InvalidCode,
    /// Replay of a spent code
    CodeAlreadyConsumed,
    /// Slot capacity exhausted
    SlotUnavailable,
    /// Stored status no longer matches the caller's observed status
    ConcurrentConflict,
    /// Usage ledger could not be read or written during creation
    QuotaCheckFailed,
    DuplicateCommand,
    InternalError,
    // Storage errors (retryable or fatal, classified from redb)
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    /// Whether the caller may retry with the latest observed state.
    ///
    /// Domain rejections are terminal: retrying an InvalidCode or
    /// SlotUnavailable without new information cannot change the outcome.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            CommandErrorCode::ConcurrentConflict
                | CommandErrorCode::QuotaCheckFailed
                | CommandErrorCode::SystemBusy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(CommandErrorCode::ConcurrentConflict.is_retryable());
        assert!(CommandErrorCode::SystemBusy.is_retryable());
        assert!(CommandErrorCode::QuotaCheckFailed.is_retryable());
        assert!(!CommandErrorCode::InvalidCode.is_retryable());
        assert!(!CommandErrorCode::CodeAlreadyConsumed.is_retryable());
        assert!(!CommandErrorCode::SlotUnavailable.is_retryable());
        assert!(!CommandErrorCode::InvalidTransition.is_retryable());
    }

    #[test]
    fn test_payload_request_id() {
        let create = RequestCommandPayload::CreateRequest {
            student_id: "stu-1".to_string(),
            clothes_type: ClothesType::Normal,
            pickup_slot_id: "slot-1".to_string(),
            notes: None,
        };
        assert!(create.request_id().is_none());

        let pickup = RequestCommandPayload::ConfirmPickup {
            request_id: "req-1".to_string(),
            presented_code: "code".to_string(),
            expected_status: RequestStatus::Created,
        };
        assert_eq!(pickup.request_id(), Some("req-1"));
    }

    #[test]
    fn test_command_wire_format() {
        let cmd = RequestCommand {
            command_id: "cmd-1".to_string(),
            actor_id: "admin-1".to_string(),
            actor_name: "Front Desk".to_string(),
            timestamp: 1_700_000_000_000,
            payload: RequestCommandPayload::ConfirmDelivery {
                request_id: "req-1".to_string(),
                presented_otp: "0420".to_string(),
                expected_status: RequestStatus::Ready,
            },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"CONFIRM_DELIVERY\""));
        assert!(json.contains("\"READY\""));
    }
}
