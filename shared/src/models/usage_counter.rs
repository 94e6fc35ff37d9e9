//! Per-student weekly usage counter

use serde::{Deserialize, Serialize};

/// Key of one quota bucket: a student within one ISO week
///
/// ISO year and week are stored separately from the calendar year
/// because the two diverge around January 1st.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WeekKey {
    pub student_id: String,
    pub iso_year: i32,
    pub iso_week: u32,
}

impl WeekKey {
    pub fn new(student_id: impl Into<String>, iso_year: i32, iso_week: u32) -> Self {
        Self {
            student_id: student_id.into(),
            iso_year,
            iso_week,
        }
    }

    /// Bucket containing the given Unix-millisecond timestamp.
    pub fn from_millis(student_id: impl Into<String>, millis: i64) -> Self {
        let (iso_year, iso_week) = crate::util::iso_week_of(millis);
        Self::new(student_id, iso_year, iso_week)
    }
}

/// Usage counter for one quota bucket
///
/// The counter records usage, it never blocks: a student past the free
/// allowance still creates requests, and the exceedance is surfaced to
/// admins who decide between flagging and charging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageCounter {
    pub student_id: String,
    pub iso_year: i32,
    pub iso_week: u32,
    /// Active requests created this week (cancellations decrement)
    pub request_count: u32,
    /// Extra charges accrued for over-allowance requests (₹)
    pub extra_charges: u32,
    /// Admin flag for follow-up instead of (or in addition to) charging
    pub flagged: bool,
    pub updated_at: i64,
}

impl UsageCounter {
    pub fn new(key: &WeekKey, now: i64) -> Self {
        Self {
            student_id: key.student_id.clone(),
            iso_year: key.iso_year,
            iso_week: key.iso_week,
            request_count: 0,
            extra_charges: 0,
            flagged: false,
            updated_at: now,
        }
    }

    /// Whether the count is past the free weekly allowance.
    pub fn exceeds_allowance(&self, free_limit: u32) -> bool {
        self.request_count > free_limit
    }
}
