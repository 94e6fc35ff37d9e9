//! Trait seam between the manager and the action/applier implementations
//!
//! - `CommandHandler`: validates a command against current state and
//!   produces events. Handlers never persist anything themselves.
//! - `EventApplier`: PURE function folding one event into a snapshot.
//! - `CommandContext`: transactional view of storage, buffering every
//!   entity the command touches so the manager can persist them in one
//!   commit.

use super::appliers::{
    DeliveryConfirmedApplier, EventAction, PickupConfirmedApplier, RequestCancelledApplier,
    RequestCreatedApplier, StatusAdvancedApplier,
};
use super::storage::{RequestStorage, StorageError};
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::models::{PickupSlot, UsageCounter, WeekKey};
use shared::request::{RequestEvent, RequestSnapshot, RequestStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while validating/executing a command
#[derive(Debug, Error)]
pub enum RequestError {
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

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for RequestError {
    fn from(e: StorageError) -> Self {
        RequestError::Storage(e.to_string())
    }
}

/// Metadata extracted from the command envelope
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub actor_id: String,
    pub actor_name: String,
    /// Client timestamp (audit only)
    pub timestamp: i64,
}

/// Transactional command context
///
/// Reads go through the write transaction so a command always sees the
/// latest committed state plus its own buffered writes. Buffered
/// entities are persisted by the manager after the action succeeds.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a RequestStorage,
    sequence: u64,
    snapshots: HashMap<String, RequestSnapshot>,
    slots: HashMap<String, PickupSlot>,
    counters: HashMap<WeekKey, UsageCounter>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a RequestStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            snapshots: HashMap::new(),
            slots: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Load a request snapshot (buffered writes take precedence)
    pub fn load_snapshot(&self, request_id: &str) -> Result<RequestSnapshot, RequestError> {
        if let Some(snapshot) = self.snapshots.get(request_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_snapshot_txn(self.txn, request_id)?
            .ok_or_else(|| RequestError::RequestNotFound(request_id.to_string()))
    }

    /// Buffer an updated snapshot
    pub fn save_snapshot(&mut self, snapshot: RequestSnapshot) {
        self.snapshots.insert(snapshot.request_id.clone(), snapshot);
    }

    /// Load a pickup slot (buffered writes take precedence)
    pub fn load_slot(&self, slot_id: &str) -> Result<PickupSlot, RequestError> {
        if let Some(slot) = self.slots.get(slot_id) {
            return Ok(slot.clone());
        }
        self.storage
            .get_slot_txn(self.txn, slot_id)?
            .ok_or_else(|| RequestError::SlotNotFound(slot_id.to_string()))
    }

    /// Buffer an updated slot
    pub fn save_slot(&mut self, slot: PickupSlot) {
        self.slots.insert(slot.slot_id.clone(), slot);
    }

    /// Load the usage counter for a quota bucket, creating a zeroed one
    /// if the student has no activity in that week yet.
    ///
    /// Ledger read failures map to `QuotaUnavailable` so creation can be
    /// rejected as retryable instead of silently skipping the count.
    pub fn load_or_init_counter(
        &self,
        key: &WeekKey,
        now: i64,
    ) -> Result<UsageCounter, RequestError> {
        if let Some(counter) = self.counters.get(key) {
            return Ok(counter.clone());
        }
        let stored = self
            .storage
            .get_counter_txn(self.txn, key)
            .map_err(|e| RequestError::QuotaUnavailable(e.to_string()))?;
        Ok(stored.unwrap_or_else(|| UsageCounter::new(key, now)))
    }

    /// Buffer an updated counter
    pub fn save_counter(&mut self, counter: UsageCounter) {
        let key = WeekKey::new(
            counter.student_id.clone(),
            counter.iso_year,
            counter.iso_week,
        );
        self.counters.insert(key, counter);
    }

    /// Snapshots modified during this command
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &RequestSnapshot> {
        self.snapshots.values()
    }

    /// Slots modified during this command
    pub fn modified_slots(&self) -> impl Iterator<Item = &PickupSlot> {
        self.slots.values()
    }

    /// Counters modified during this command
    pub fn modified_counters(&self) -> impl Iterator<Item = &UsageCounter> {
        self.counters.values()
    }
}

/// Command handler - executed inside the manager's write transaction
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<RequestEvent>, RequestError>;
}

/// Event applier - pure fold of one event into a snapshot
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut RequestSnapshot, event: &RequestEvent);
}
