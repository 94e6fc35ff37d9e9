//! redb-based storage layer for request event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(request_id, sequence)` | `RequestEvent` | Event stream (append-only) |
//! | `snapshots` | `request_id` | `RequestSnapshot` | Snapshot cache |
//! | `active_requests` | `request_id` | `()` | Active request index |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `"seq"` | `u64` | Global sequence |
//! | `code_index` | `qr_code` | `request_id` | Scanned-code lookup |
//! | `pickup_slots` | `slot_id` | `PickupSlot` | Slot registry |
//! | `usage_counters` | `(student_id, iso_year, iso_week)` | `UsageCounter` | Weekly quota ledger |
//!
//! All request, slot, and counter state shares one database so that a
//! creation or cancellation updates all three in a single transaction.
//! redb serializes write transactions, which makes slot reserve/release
//! linearizable without extra locking.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns the
//! change survives power loss and the file stays consistent.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{PickupSlot, UsageCounter, WeekKey};
use shared::request::{RequestEvent, RequestSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (request_id, sequence), value = JSON-serialized RequestEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Table for storing snapshots: key = request_id, value = JSON-serialized RequestSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Table for tracking active requests: key = request_id, value = empty (existence check)
const ACTIVE_REQUESTS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_requests");

/// Table for tracking processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Table for sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Table mapping QR token values to request IDs (scanned-code lookup)
const CODE_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("code_index");

/// Table for pickup slots: key = slot_id, value = JSON-serialized PickupSlot
const SLOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("pickup_slots");

/// Table for usage counters: key = (student_id, iso_year, iso_week),
/// value = JSON-serialized UsageCounter
const USAGE_COUNTERS_TABLE: TableDefinition<(&str, i32, u32), &[u8]> =
    TableDefinition::new("usage_counters");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request not found: {0}")]
    RequestNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Request storage backed by redb
#[derive(Clone)]
pub struct RequestStorage {
    db: Arc<Database>,
}

impl RequestStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_REQUESTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(CODE_INDEX_TABLE)?;
            let _ = write_txn.open_table(SLOTS_TABLE)?;
            let _ = write_txn.open_table(USAGE_COUNTERS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &RequestEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.request_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for a request
    pub fn get_events_for_request(&self, request_id: &str) -> StorageResult<Vec<RequestEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (request_id, 0u64);
        let range_end = (request_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: RequestEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events since a given sequence (across all requests)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<RequestEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: RequestEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &RequestSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.request_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a snapshot by request ID
    pub fn get_snapshot(&self, request_id: &str) -> StorageResult<Option<RequestSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(request_id)? {
            Some(value) => {
                let snapshot: RequestSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get a snapshot by request ID (within transaction)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<RequestSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(request_id)? {
            Some(value) => {
                let snapshot: RequestSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    // ========== Active Requests ==========

    /// Mark a request as active
    pub fn mark_request_active(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_REQUESTS_TABLE)?;
        table.insert(request_id, ())?;
        Ok(())
    }

    /// Mark a request as inactive (terminal)
    pub fn mark_request_inactive(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_REQUESTS_TABLE)?;
        table.remove(request_id)?;
        Ok(())
    }

    /// Get all active request IDs
    pub fn get_active_request_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_REQUESTS_TABLE)?;

        let mut request_ids: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            request_ids.push(key.value().to_string());
        }

        Ok(request_ids)
    }

    /// Get all active request snapshots
    pub fn get_active_requests(&self) -> StorageResult<Vec<RequestSnapshot>> {
        let active_ids = self.get_active_request_ids()?;
        let mut snapshots = Vec::new();

        for request_id in active_ids {
            if let Some(snapshot) = self.get_snapshot(&request_id)? {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    /// Get all snapshots for one student, terminal ones included
    ///
    /// Full table scan; the request tracking pages sort client-side.
    pub fn get_requests_for_student(
        &self,
        student_id: &str,
    ) -> StorageResult<Vec<RequestSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: RequestSnapshot = serde_json::from_slice(value.value())?;
            if snapshot.student_id == student_id {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    // ========== Code Index ==========

    /// Index a QR token value so a scanned code resolves to its request
    pub fn index_code(
        &self,
        txn: &WriteTransaction,
        code: &str,
        request_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CODE_INDEX_TABLE)?;
        table.insert(code, request_id)?;
        Ok(())
    }

    /// Resolve a scanned QR token to a request ID
    pub fn find_request_by_code(&self, code: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CODE_INDEX_TABLE)?;
        Ok(table.get(code)?.map(|guard| guard.value().to_string()))
    }

    // ========== Pickup Slots ==========

    /// Store a slot (within transaction)
    pub fn store_slot(&self, txn: &WriteTransaction, slot: &PickupSlot) -> StorageResult<()> {
        let mut table = txn.open_table(SLOTS_TABLE)?;
        let value = serde_json::to_vec(slot)?;
        table.insert(slot.slot_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a slot by ID
    pub fn get_slot(&self, slot_id: &str) -> StorageResult<Option<PickupSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;

        match table.get(slot_id)? {
            Some(value) => {
                let slot: PickupSlot = serde_json::from_slice(value.value())?;
                Ok(Some(slot))
            }
            None => Ok(None),
        }
    }

    /// Get a slot by ID (within transaction)
    pub fn get_slot_txn(
        &self,
        txn: &WriteTransaction,
        slot_id: &str,
    ) -> StorageResult<Option<PickupSlot>> {
        let table = txn.open_table(SLOTS_TABLE)?;

        match table.get(slot_id)? {
            Some(value) => {
                let slot: PickupSlot = serde_json::from_slice(value.value())?;
                Ok(Some(slot))
            }
            None => Ok(None),
        }
    }

    /// Get all slots
    pub fn get_all_slots(&self) -> StorageResult<Vec<PickupSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;

        let mut slots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let slot: PickupSlot = serde_json::from_slice(value.value())?;
            slots.push(slot);
        }

        Ok(slots)
    }

    /// Remove a slot
    pub fn remove_slot(&self, txn: &WriteTransaction, slot_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(SLOTS_TABLE)?;
        table.remove(slot_id)?;
        Ok(())
    }

    // ========== Usage Counters ==========

    /// Store a usage counter (within transaction)
    pub fn store_counter(
        &self,
        txn: &WriteTransaction,
        counter: &UsageCounter,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(USAGE_COUNTERS_TABLE)?;
        let key = (
            counter.student_id.as_str(),
            counter.iso_year,
            counter.iso_week,
        );
        let value = serde_json::to_vec(counter)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get a usage counter
    pub fn get_counter(&self, key: &WeekKey) -> StorageResult<Option<UsageCounter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USAGE_COUNTERS_TABLE)?;

        match table.get((key.student_id.as_str(), key.iso_year, key.iso_week))? {
            Some(value) => {
                let counter: UsageCounter = serde_json::from_slice(value.value())?;
                Ok(Some(counter))
            }
            None => Ok(None),
        }
    }

    /// Get a usage counter (within transaction)
    pub fn get_counter_txn(
        &self,
        txn: &WriteTransaction,
        key: &WeekKey,
    ) -> StorageResult<Option<UsageCounter>> {
        let table = txn.open_table(USAGE_COUNTERS_TABLE)?;

        match table.get((key.student_id.as_str(), key.iso_year, key.iso_week))? {
            Some(value) => {
                let counter: UsageCounter = serde_json::from_slice(value.value())?;
                Ok(Some(counter))
            }
            None => Ok(None),
        }
    }

    /// Get all counters for one student across weeks
    pub fn get_counters_for_student(&self, student_id: &str) -> StorageResult<Vec<UsageCounter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USAGE_COUNTERS_TABLE)?;

        let range_start = (student_id, i32::MIN, 0u32);
        let range_end = (student_id, i32::MAX, u32::MAX);

        let mut counters = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let counter: UsageCounter = serde_json::from_slice(value.value())?;
            counters.push(counter);
        }

        Ok(counters)
    }

    /// Get all counters in one ISO week (table scan, weekly report size)
    pub fn get_counters_for_week(
        &self,
        iso_year: i32,
        iso_week: u32,
    ) -> StorageResult<Vec<UsageCounter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USAGE_COUNTERS_TABLE)?;

        let mut counters = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let counter: UsageCounter = serde_json::from_slice(value.value())?;
            if counter.iso_year == iso_year && counter.iso_week == iso_week {
                counters.push(counter);
            }
        }

        Ok(counters)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let active_table = read_txn.open_table(ACTIVE_REQUESTS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let slots_table = read_txn.open_table(SLOTS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            event_count: events_table.len()?,
            snapshot_count: snapshots_table.len()?,
            active_request_count: active_table.len()?,
            processed_command_count: commands_table.len()?,
            slot_count: slots_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub event_count: u64,
    pub snapshot_count: u64,
    pub active_request_count: u64,
    pub processed_command_count: u64,
    pub slot_count: u64,
    pub current_sequence: u64,
}
