//! Command result conversion
//!
//! Maps command pipeline outcomes onto HTTP status codes. Domain errors
//! keep their structured body so clients can branch on the error code and
//! the retryability hint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shared::request::{CommandErrorCode, CommandResponse};

/// HTTP status for one command error code
pub fn status_for(code: CommandErrorCode) -> StatusCode {
    match code {
        CommandErrorCode::RequestNotFound | CommandErrorCode::SlotNotFound => {
            StatusCode::NOT_FOUND
        }
        CommandErrorCode::ConcurrentConflict
        | CommandErrorCode::CodeAlreadyConsumed
        | CommandErrorCode::SlotUnavailable
        | CommandErrorCode::DuplicateCommand => StatusCode::CONFLICT,
        CommandErrorCode::InvalidTransition | CommandErrorCode::InvalidCode => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CommandErrorCode::QuotaCheckFailed
        | CommandErrorCode::SystemBusy
        | CommandErrorCode::StorageFull => StatusCode::SERVICE_UNAVAILABLE,
        CommandErrorCode::OutOfMemory
        | CommandErrorCode::StorageCorrupted
        | CommandErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Command response body with the retryability hint attached
#[derive(Serialize)]
struct CommandResponseBody {
    #[serde(flatten)]
    response: CommandResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

/// Turn a command response into an HTTP response
pub fn command_response(response: CommandResponse) -> Response {
    let (status, retryable) = match &response.error {
        None => (StatusCode::OK, None),
        Some(err) => (status_for(err.code), Some(err.code.is_retryable())),
    };

    let body = CommandResponseBody {
        response,
        retryable,
    };

    (status, Json(body)).into_response()
}
