//! Request API Handlers

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::convert;
use crate::core::{Result, ServerError, ServerState};
use crate::requests::ManagerError;
use shared::request::{RequestCommand, RequestEvent, RequestSnapshot};

fn map_query_error(e: ManagerError) -> ServerError {
    match e {
        ManagerError::RequestNotFound(_) => ServerError::NotFound,
        other => ServerError::Internal(anyhow::anyhow!(other)),
    }
}

/// Submit a lifecycle command
///
/// The HTTP status follows the command error code; the body is always the
/// full command response so clients can branch on `error.code`.
pub async fn submit_command(
    State(state): State<ServerState>,
    Json(cmd): Json<RequestCommand>,
) -> Response {
    let response = state.manager.execute_command(cmd);
    convert::command_response(response)
}

/// List active (non-terminal) requests
pub async fn list_active(State(state): State<ServerState>) -> Result<Json<Vec<RequestSnapshot>>> {
    let requests = state
        .manager
        .get_active_requests()
        .map_err(map_query_error)?;
    Ok(Json(requests))
}

/// List one student's requests, terminal ones included
pub async fn list_for_student(
    State(state): State<ServerState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<RequestSnapshot>>> {
    let requests = state
        .manager
        .get_requests_for_student(&student_id)
        .map_err(map_query_error)?;
    Ok(Json(requests))
}

/// Get request by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<RequestSnapshot>> {
    let snapshot = state
        .manager
        .get_snapshot(&id)
        .map_err(map_query_error)?
        .ok_or(ServerError::NotFound)?;
    Ok(Json(snapshot))
}

/// Get request by QR token
///
/// Lets the pickup station resolve a scanned code to the request before
/// submitting ConfirmPickup. Works for spent codes too: the snapshot shows
/// whether the code was already consumed.
pub async fn get_by_code(
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> Result<Json<RequestSnapshot>> {
    let snapshot = state
        .manager
        .get_request_by_code(&code)
        .map_err(map_query_error)?
        .ok_or(ServerError::NotFound)?;
    Ok(Json(snapshot))
}

/// Full event trail for one request
pub async fn get_request_events(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RequestEvent>>> {
    // Distinguish "unknown request" from "no events yet": a request with
    // zero events does not exist (creation always emits one).
    let events = state
        .manager
        .get_events_for_request(&id)
        .map_err(map_query_error)?;
    if events.is_empty() {
        return Err(ServerError::NotFound);
    }
    Ok(Json(events))
}

/// Query params for the event cursor
#[derive(Debug, Deserialize)]
pub struct EventsSinceQuery {
    #[serde(default)]
    pub since: u64,
}

/// Cursor response: events plus the epoch the cursor is valid for
#[derive(Serialize)]
pub struct EventsSinceResponse {
    pub epoch: String,
    pub last_sequence: u64,
    pub events: Vec<RequestEvent>,
}

/// Events with sequence greater than `since`
///
/// The epoch changes on restart; a poller seeing a new epoch must reset
/// its cursor to zero.
pub async fn get_events_since(
    State(state): State<ServerState>,
    Query(query): Query<EventsSinceQuery>,
) -> Result<Json<EventsSinceResponse>> {
    let events = state
        .manager
        .get_events_since(query.since)
        .map_err(map_query_error)?;
    let last_sequence = events.last().map(|e| e.sequence).unwrap_or(query.since);

    Ok(Json(EventsSinceResponse {
        epoch: state.manager.epoch().to_string(),
        last_sequence,
        events,
    }))
}
