//! Usage API Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::{Result, ServerError, ServerState};
use crate::quota::LedgerError;
use shared::models::{UsageCounter, WeekKey};

fn map_ledger_error(e: LedgerError) -> ServerError {
    match e {
        LedgerError::CounterNotFound(..) => ServerError::NotFound,
        LedgerError::Storage(inner) => ServerError::Internal(inner.into()),
    }
}

/// Counter view with the allowance verdict applied
#[derive(Serialize)]
pub struct UsageEntry {
    pub student_id: String,
    pub iso_year: i32,
    pub iso_week: u32,
    pub request_count: u32,
    pub exceeds_allowance: bool,
    /// Accrued extra charges (₹)
    pub extra_charges: u32,
    pub flagged: bool,
}

impl UsageEntry {
    fn from_counter(counter: UsageCounter, free_limit: u32) -> Self {
        let exceeds_allowance = counter.exceeds_allowance(free_limit);
        Self {
            student_id: counter.student_id,
            iso_year: counter.iso_year,
            iso_week: counter.iso_week,
            request_count: counter.request_count,
            exceeds_allowance,
            extra_charges: counter.extra_charges,
            flagged: counter.flagged,
        }
    }
}

/// Weekly report
#[derive(Serialize)]
pub struct WeekReport {
    pub iso_year: i32,
    pub iso_week: u32,
    pub free_limit: u32,
    pub entries: Vec<UsageEntry>,
}

/// All counters for one ISO week
pub async fn week_report(
    State(state): State<ServerState>,
    Path((iso_year, iso_week)): Path<(i32, u32)>,
) -> Result<Json<WeekReport>> {
    let free_limit = state.ledger.free_limit();
    let counters = state
        .ledger
        .get_week_report(iso_year, iso_week)
        .map_err(map_ledger_error)?;

    let entries = counters
        .into_iter()
        .map(|c| UsageEntry::from_counter(c, free_limit))
        .collect();

    Ok(Json(WeekReport {
        iso_year,
        iso_week,
        free_limit,
        entries,
    }))
}

/// One student's counters across weeks
pub async fn student_history(
    State(state): State<ServerState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<UsageEntry>>> {
    let free_limit = state.ledger.free_limit();
    let counters = state
        .ledger
        .get_student_history(&student_id)
        .map_err(map_ledger_error)?;

    let entries = counters
        .into_iter()
        .map(|c| UsageEntry::from_counter(c, free_limit))
        .collect();

    Ok(Json(entries))
}

/// Single counter
pub async fn get_counter(
    State(state): State<ServerState>,
    Path((student_id, iso_year, iso_week)): Path<(String, i32, u32)>,
) -> Result<Json<UsageEntry>> {
    let key = WeekKey::new(&student_id, iso_year, iso_week);
    let counter = state.ledger.get_counter(&key).map_err(map_ledger_error)?;
    Ok(Json(UsageEntry::from_counter(
        counter,
        state.ledger.free_limit(),
    )))
}

/// Flag request body
#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub flagged: bool,
}

/// Flag (or clear the flag on) a counter
pub async fn set_flag(
    State(state): State<ServerState>,
    Path((student_id, iso_year, iso_week)): Path<(String, i32, u32)>,
    Json(body): Json<FlagRequest>,
) -> Result<Json<UsageEntry>> {
    let key = WeekKey::new(&student_id, iso_year, iso_week);
    let counter = state
        .ledger
        .set_flag(&key, body.flagged)
        .map_err(map_ledger_error)?;
    Ok(Json(UsageEntry::from_counter(
        counter,
        state.ledger.free_limit(),
    )))
}

/// Extra charge request body
#[derive(Debug, Deserialize)]
pub struct ExtraChargeRequest {
    /// Total extra charge (₹) for the week, replacing the accrued amount
    pub amount: u32,
}

/// Set the extra-charge amount outright
pub async fn set_extra_charge(
    State(state): State<ServerState>,
    Path((student_id, iso_year, iso_week)): Path<(String, i32, u32)>,
    Json(body): Json<ExtraChargeRequest>,
) -> Result<Json<UsageEntry>> {
    let key = WeekKey::new(&student_id, iso_year, iso_week);
    let counter = state
        .ledger
        .set_extra_charge(&key, body.amount)
        .map_err(map_ledger_error)?;
    Ok(Json(UsageEntry::from_counter(
        counter,
        state.ledger.free_limit(),
    )))
}
