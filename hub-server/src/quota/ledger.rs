//! Administrative and reporting view over the usage counters

use crate::requests::storage::{RequestStorage, StorageError};
use shared::models::{UsageCounter, WeekKey};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No usage counter for student {0} in week {1}/{2}")]
    CounterNotFound(String, i32, u32),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Usage ledger over the shared storage
#[derive(Clone)]
pub struct UsageLedger {
    storage: RequestStorage,
    /// Free weekly request allowance per student
    free_limit: u32,
}

impl UsageLedger {
    pub fn new(storage: RequestStorage, free_limit: u32) -> Self {
        Self {
            storage,
            free_limit,
        }
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Fetch one counter
    pub fn get_counter(&self, key: &WeekKey) -> LedgerResult<UsageCounter> {
        self.storage.get_counter(key)?.ok_or_else(|| {
            LedgerError::CounterNotFound(key.student_id.clone(), key.iso_year, key.iso_week)
        })
    }

    /// All counters for one ISO week (weekly over-usage report)
    pub fn get_week_report(&self, iso_year: i32, iso_week: u32) -> LedgerResult<Vec<UsageCounter>> {
        Ok(self.storage.get_counters_for_week(iso_year, iso_week)?)
    }

    /// One student's counters across weeks
    pub fn get_student_history(&self, student_id: &str) -> LedgerResult<Vec<UsageCounter>> {
        Ok(self.storage.get_counters_for_student(student_id)?)
    }

    /// Admin override: flag (or clear the flag on) an over-usage counter.
    /// Independent of the automatic over-limit detection.
    pub fn set_flag(&self, key: &WeekKey, flagged: bool) -> LedgerResult<UsageCounter> {
        let txn = self.storage.begin_write()?;
        let mut counter = self.storage.get_counter_txn(&txn, key)?.ok_or_else(|| {
            LedgerError::CounterNotFound(key.student_id.clone(), key.iso_year, key.iso_week)
        })?;

        counter.flagged = flagged;
        counter.updated_at = shared::util::now_millis();
        self.storage.store_counter(&txn, &counter)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            student_id = %key.student_id,
            iso_year = key.iso_year,
            iso_week = key.iso_week,
            flagged,
            "Usage counter flag updated"
        );
        Ok(counter)
    }

    /// Admin override: set the extra-charge amount (₹) outright,
    /// replacing whatever accrued automatically.
    pub fn set_extra_charge(&self, key: &WeekKey, amount: u32) -> LedgerResult<UsageCounter> {
        let txn = self.storage.begin_write()?;
        let mut counter = self.storage.get_counter_txn(&txn, key)?.ok_or_else(|| {
            LedgerError::CounterNotFound(key.student_id.clone(), key.iso_year, key.iso_week)
        })?;

        counter.extra_charges = amount;
        counter.updated_at = shared::util::now_millis();
        self.storage.store_counter(&txn, &counter)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            student_id = %key.student_id,
            iso_year = key.iso_year,
            iso_week = key.iso_week,
            amount,
            "Extra charge set by admin"
        );
        Ok(counter)
    }
}
