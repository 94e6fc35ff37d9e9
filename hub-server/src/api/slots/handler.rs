//! Pickup Slot API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::core::{Result, ServerError, ServerState};
use crate::slots::{NewSlot, SlotError, SlotUpdate};
use shared::models::PickupSlot;

fn map_slot_error(e: SlotError) -> ServerError {
    match e {
        SlotError::SlotNotFound(_) => ServerError::NotFound,
        SlotError::CapacityBelowConsumed { .. } => ServerError::Validation(e.to_string()),
        SlotError::SlotInUse(..) => ServerError::Conflict(e.to_string()),
        SlotError::Storage(inner) => ServerError::Internal(inner.into()),
    }
}

/// Create a pickup slot
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<NewSlot>,
) -> Result<(StatusCode, Json<PickupSlot>)> {
    let slot = state.slots.create_slot(input).map_err(map_slot_error)?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// List all slots
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<PickupSlot>>> {
    let slots = state.slots.list_slots().map_err(map_slot_error)?;
    Ok(Json(slots))
}

/// Get slot by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<PickupSlot>> {
    let slot = state.slots.get_slot(&id).map_err(map_slot_error)?;
    Ok(Json(slot))
}

/// Update capacity, staff assignment or active flag
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(update): Json<SlotUpdate>,
) -> Result<Json<PickupSlot>> {
    let slot = state
        .slots
        .update_slot(&id, update)
        .map_err(map_slot_error)?;
    Ok(Json(slot))
}

/// Delete a slot (rejected while reservations are live)
pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.slots.delete_slot(&id).map_err(map_slot_error)?;
    Ok(StatusCode::NO_CONTENT)
}
