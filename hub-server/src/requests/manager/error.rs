use super::super::storage::StorageError;
use super::super::traits::RequestError;
use shared::request::{CommandError, CommandErrorCode, RequestStatus};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Request not found: {0}")]
    RequestNotFound(String),

    #[error("Pickup slot not found: {0}")]
    SlotNotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid code: {0}")]
    InvalidCode(String),

    #[error("Code already consumed: {0}")]
    CodeAlreadyConsumed(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Concurrent modification: expected {expected}, found {actual}")]
    ConcurrentConflict {
        expected: RequestStatus,
        actual: RequestStatus,
    },

    #[error("Usage ledger unavailable: {0}")]
    QuotaUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classify a storage error into an error code (clients decide whether
/// to retry based on the code).
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    // Exact enum variants first
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::RequestNotFound(_) => return CommandErrorCode::RequestNotFound,
        _ => {}
    }

    // redb errors are classified by string matching
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // Default: transient busy (redb Database/Transaction/Table/Commit errors)
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::RequestNotFound(id) => (
                CommandErrorCode::RequestNotFound,
                format!("Request not found: {}", id),
            ),
            ManagerError::SlotNotFound(id) => (
                CommandErrorCode::SlotNotFound,
                format!("Pickup slot not found: {}", id),
            ),
            ManagerError::InvalidTransition(msg) => (CommandErrorCode::InvalidTransition, msg),
            ManagerError::InvalidCode(msg) => (CommandErrorCode::InvalidCode, msg),
            ManagerError::CodeAlreadyConsumed(msg) => {
                (CommandErrorCode::CodeAlreadyConsumed, msg)
            }
            ManagerError::SlotUnavailable(msg) => (CommandErrorCode::SlotUnavailable, msg),
            ManagerError::ConcurrentConflict { expected, actual } => (
                CommandErrorCode::ConcurrentConflict,
                format!(
                    "Request status changed: expected {}, found {}",
                    expected, actual
                ),
            ),
            ManagerError::QuotaUnavailable(msg) => (CommandErrorCode::QuotaCheckFailed, msg),
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<RequestError> for ManagerError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RequestNotFound(id) => ManagerError::RequestNotFound(id),
            RequestError::SlotNotFound(id) => ManagerError::SlotNotFound(id),
            RequestError::InvalidTransition(msg) => ManagerError::InvalidTransition(msg),
            RequestError::InvalidCode(msg) => ManagerError::InvalidCode(msg),
            RequestError::CodeAlreadyConsumed(msg) => ManagerError::CodeAlreadyConsumed(msg),
            RequestError::SlotUnavailable(msg) => ManagerError::SlotUnavailable(msg),
            RequestError::ConcurrentConflict { expected, actual } => {
                ManagerError::ConcurrentConflict { expected, actual }
            }
            RequestError::QuotaUnavailable(msg) => ManagerError::QuotaUnavailable(msg),
            RequestError::Storage(msg) => ManagerError::Internal(msg),
            RequestError::Internal(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
