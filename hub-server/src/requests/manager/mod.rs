//! RequestManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Snapshot updates
//! - Event broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Pre-generate IDs and codes (outside the transaction)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Create CommandContext
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events, snapshots, slots and counters
//!     ├─ 8. Mark command processed
//!     ├─ 9. Commit transaction
//!     ├─ 10. Broadcast event(s)
//!     └─ 11. Return response
//! ```

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::EventAction;
use super::codes;
use super::storage::{RequestStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use shared::request::{
    CommandResponse, EventPayload, RequestCommand, RequestCommandPayload, RequestEvent,
    RequestSnapshot, RequestStatus,
};
use std::path::Path;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 8192;

/// RequestManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger full resync.
pub struct RequestManager {
    storage: RequestStorage,
    event_tx: broadcast::Sender<RequestEvent>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    /// Free weekly request allowance per student
    free_limit: u32,
    /// Charge accrued per over-allowance request (₹)
    extra_charge: u32,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("storage", &"<RequestStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .field("free_limit", &self.free_limit)
            .finish()
    }
}

impl RequestManager {
    /// Create a new RequestManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        free_limit: u32,
        extra_charge: u32,
    ) -> ManagerResult<Self> {
        let storage = RequestStorage::open(db_path)?;
        Ok(Self::with_storage(storage, free_limit, extra_charge))
    }

    /// Create a RequestManager over existing storage
    pub fn with_storage(storage: RequestStorage, free_limit: u32, extra_charge: u32) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, free_limit, "RequestManager started with new epoch");
        Self {
            storage,
            event_tx,
            epoch,
            free_limit,
            extra_charge,
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &RequestStorage {
        &self.storage
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: RequestCommand) -> CommandResponse {
        match self.process_command(cmd.clone()) {
            Ok((response, events)) => {
                // Broadcast events after successful commit
                for event in events {
                    if self.event_tx.send(event).is_err() {
                        tracing::warn!("Event broadcast failed: no active receivers");
                        break;
                    }
                }
                response
            }
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Process command and return response with events
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically
    fn process_command(
        &self,
        cmd: RequestCommand,
    ) -> ManagerResult<(CommandResponse, Vec<RequestEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. Pre-generate the request ID and verification codes BEFORE
        // the transaction; redb doesn't allow nested write transactions
        // and code generation must not happen inside a retry loop.
        let pre_generated_request = match &cmd.payload {
            RequestCommandPayload::CreateRequest { .. } => {
                let request_id = uuid::Uuid::new_v4().to_string();
                let qr_code = codes::generate_qr_token();
                tracing::debug!(request_id = %request_id, "Pre-generated request ID and QR token");
                Some((request_id, qr_code))
            }
            _ => None,
        };
        let pre_generated_otp = match &cmd.payload {
            RequestCommandPayload::AdvanceStatus {
                target_status: RequestStatus::Ready,
                ..
            } => Some(codes::generate_otp()),
            _ => None,
        };

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 4. Get current sequence for context initialization
        let current_sequence = self.storage.get_current_sequence()?;

        // 5. Create context and metadata
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            actor_id: cmd.actor_id.clone(),
            actor_name: cmd.actor_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 6. Convert to action and execute
        // CreateRequest and AdvanceStatus-to-Ready carry pre-generated codes
        let action: CommandAction = match &cmd.payload {
            RequestCommandPayload::CreateRequest {
                student_id,
                clothes_type,
                pickup_slot_id,
                notes,
            } => {
                let (request_id, qr_code) = pre_generated_request.ok_or_else(|| {
                    ManagerError::Internal(
                        "request ID must be pre-generated for CreateRequest".to_string(),
                    )
                })?;
                CommandAction::CreateRequest(super::actions::CreateRequestAction {
                    request_id,
                    student_id: student_id.clone(),
                    clothes_type: *clothes_type,
                    pickup_slot_id: pickup_slot_id.clone(),
                    notes: notes.clone(),
                    qr_code,
                    free_limit: self.free_limit,
                    extra_charge: self.extra_charge,
                })
            }
            RequestCommandPayload::AdvanceStatus {
                request_id,
                target_status,
                expected_status,
            } => CommandAction::AdvanceStatus(super::actions::AdvanceStatusAction {
                request_id: request_id.clone(),
                target_status: *target_status,
                expected_status: *expected_status,
                otp: pre_generated_otp,
            }),
            _ => (&cmd).into(),
        };
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // 7. Apply events to snapshots
        for event in &events {
            // RequestCreated starts from an empty snapshot
            let mut snapshot = ctx
                .load_snapshot(&event.request_id)
                .unwrap_or_else(|_| RequestSnapshot::new(event.request_id.clone()));

            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);

            ctx.save_snapshot(snapshot);
        }

        // 8. Persist events and maintain the QR lookup index
        for event in &events {
            self.storage.store_event(&txn, event)?;
            if let EventPayload::RequestCreated { qr_code, .. } = &event.payload {
                self.storage.index_code(&txn, qr_code, &event.request_id)?;
            }
        }

        // 9. Persist snapshots and update active request tracking
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(&txn, snapshot)?;
            if snapshot.is_terminal() {
                self.storage.mark_request_inactive(&txn, &snapshot.request_id)?;
            } else {
                self.storage.mark_request_active(&txn, &snapshot.request_id)?;
            }
        }

        // 10. Persist slot and counter changes buffered by the action
        for slot in ctx.modified_slots() {
            self.storage.store_slot(&txn, slot)?;
        }
        for counter in ctx.modified_counters() {
            self.storage.store_counter(&txn, counter)?;
        }

        // 11. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 12. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 13. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        // 14. Return response
        let request_id = events.first().map(|e| e.request_id.clone());
        tracing::info!(
            command_id = %cmd.command_id,
            request_id = ?request_id,
            event_count = events.len(),
            "Command processed successfully"
        );
        Ok((CommandResponse::success(cmd.command_id, request_id), events))
    }

    // ========== Public Query Methods ==========

    /// Get a snapshot by request ID
    pub fn get_snapshot(&self, request_id: &str) -> ManagerResult<Option<RequestSnapshot>> {
        Ok(self.storage.get_snapshot(request_id)?)
    }

    /// Get all active (non-terminal) request snapshots
    pub fn get_active_requests(&self) -> ManagerResult<Vec<RequestSnapshot>> {
        Ok(self.storage.get_active_requests()?)
    }

    /// Resolve a presented QR token to its request snapshot
    ///
    /// Used by the pickup desk to look up the request before confirming.
    pub fn get_request_by_code(&self, code: &str) -> ManagerResult<Option<RequestSnapshot>> {
        match self.storage.find_request_by_code(code)? {
            Some(request_id) => Ok(self.storage.get_snapshot(&request_id)?),
            None => Ok(None),
        }
    }

    /// Get all requests ever made by one student (request history view)
    pub fn get_requests_for_student(
        &self,
        student_id: &str,
    ) -> ManagerResult<Vec<RequestSnapshot>> {
        Ok(self.storage.get_requests_for_student(student_id)?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<RequestEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get all events for a specific request
    pub fn get_events_for_request(&self, request_id: &str) -> ManagerResult<Vec<RequestEvent>> {
        Ok(self.storage.get_events_for_request(request_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    ///
    /// Uses EventApplier to apply each event to build the snapshot.
    pub fn rebuild_snapshot(&self, request_id: &str) -> ManagerResult<RequestSnapshot> {
        let events = self.storage.get_events_for_request(request_id)?;
        if events.is_empty() {
            return Err(ManagerError::RequestNotFound(request_id.to_string()));
        }
        Ok(super::appliers::replay(request_id, &events))
    }
}

// Make RequestManager Clone-able via Arc
impl Clone for RequestManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
            free_limit: self.free_limit,
            extra_charge: self.extra_charge,
        }
    }
}

#[cfg(test)]
mod tests;
