//! Usage quota ledger - admin and reporting side
//!
//! Automatic counting (increment on create, reversal on cancel) lives in
//! the request lifecycle actions; this module covers the administrative
//! overrides and the reporting reads.

mod ledger;

pub use ledger::{LedgerError, LedgerResult, UsageLedger};
