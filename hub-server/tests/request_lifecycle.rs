//! End-to-end lifecycle tests against an on-disk database
//!
//! Commands are executed the way the HTTP layer does it, including the
//! concurrent contention cases that in-process unit tests cannot cover.

use hub_server::{RequestManager, SlotAllocator, UsageLedger};
use shared::models::WeekKey;
use shared::request::{
    ClothesType, RequestCommand, RequestCommandPayload, RequestStatus,
};
use shared::util::iso_week_of;
use std::sync::Arc;

const FREE_LIMIT: u32 = 2;
const EXTRA_CHARGE: u32 = 10;

fn open_manager(dir: &std::path::Path) -> RequestManager {
    RequestManager::new(dir.join("hub.redb"), FREE_LIMIT, EXTRA_CHARGE)
        .expect("failed to open manager")
}

fn seed_slot(manager: &RequestManager, capacity: u32) -> String {
    let allocator = SlotAllocator::new(manager.storage().clone());
    let slot = allocator
        .create_slot(hub_server::slots::NewSlot {
            hostel_block: "Block A".to_string(),
            date: "2026-03-02".to_string(),
            start_time: 1_772_400_000_000,
            end_time: 1_772_403_600_000,
            capacity,
            assigned_staff: Some("staff-1".to_string()),
        })
        .expect("failed to create slot");
    slot.slot_id
}

fn create_request(manager: &RequestManager, student_id: &str, slot_id: &str) -> String {
    let cmd = RequestCommand::new(
        student_id.to_string(),
        "Student".to_string(),
        RequestCommandPayload::CreateRequest {
            student_id: student_id.to_string(),
            clothes_type: ClothesType::Normal,
            pickup_slot_id: slot_id.to_string(),
            notes: None,
        },
    );
    let resp = manager.execute_command(cmd);
    assert!(resp.success, "create failed: {:?}", resp.error);
    resp.request_id.expect("create returns the new request id")
}

fn bring_to_ready(manager: &RequestManager, request_id: &str) -> String {
    let snapshot = manager.get_snapshot(request_id).unwrap().unwrap();
    let qr = snapshot.qr_code.value.clone();

    let resp = manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::ConfirmPickup {
            request_id: request_id.to_string(),
            presented_code: qr,
            expected_status: RequestStatus::Created,
        },
    ));
    assert!(resp.success, "pickup failed: {:?}", resp.error);

    for (from, to) in [
        (RequestStatus::PickedUp, RequestStatus::Washing),
        (RequestStatus::Washing, RequestStatus::Drying),
        (RequestStatus::Drying, RequestStatus::Ready),
    ] {
        let resp = manager.execute_command(RequestCommand::new(
            "admin-1".to_string(),
            "Front Desk".to_string(),
            RequestCommandPayload::AdvanceStatus {
                request_id: request_id.to_string(),
                target_status: to,
                expected_status: from,
            },
        ));
        assert!(resp.success, "advance to {to} failed: {:?}", resp.error);
    }

    let snapshot = manager.get_snapshot(request_id).unwrap().unwrap();
    snapshot.otp.expect("OTP installed on Ready").value
}

#[test]
fn full_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    let slot_id = seed_slot(&manager, 5);

    let request_id = create_request(&manager, "stu-1", &slot_id);
    let otp = bring_to_ready(&manager, &request_id);
    assert_eq!(otp.len(), 4);

    let resp = manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::ConfirmDelivery {
            request_id: request_id.clone(),
            presented_otp: otp,
            expected_status: RequestStatus::Ready,
        },
    ));
    assert!(resp.success, "delivery failed: {:?}", resp.error);

    let snapshot = manager.get_snapshot(&request_id).unwrap().unwrap();
    assert_eq!(snapshot.status, RequestStatus::Delivered);
    assert!(snapshot.qr_code.consumed);
    assert!(snapshot.otp.unwrap().consumed);
    assert!(manager.get_active_requests().unwrap().is_empty());
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let (request_id, first_epoch) = {
        let manager = open_manager(dir.path());
        let slot_id = seed_slot(&manager, 2);
        let request_id = create_request(&manager, "stu-1", &slot_id);
        (request_id, manager.epoch().to_string())
    };

    let manager = open_manager(dir.path());
    assert_ne!(manager.epoch(), first_epoch, "epoch changes per instance");

    let snapshot = manager.get_snapshot(&request_id).unwrap().unwrap();
    assert_eq!(snapshot.status, RequestStatus::Created);

    // The reopened manager keeps processing from the persisted sequence
    let rebuilt = manager.rebuild_snapshot(&request_id).unwrap();
    assert_eq!(rebuilt.last_sequence, snapshot.last_sequence);
}

#[test]
fn capacity_one_slot_admits_exactly_one_concurrent_create() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(open_manager(dir.path()));
    let slot_id = seed_slot(&manager, 1);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let slot_id = slot_id.clone();
            std::thread::spawn(move || {
                let cmd = RequestCommand::new(
                    format!("stu-{i}"),
                    "Student".to_string(),
                    RequestCommandPayload::CreateRequest {
                        student_id: format!("stu-{i}"),
                        clothes_type: ClothesType::Normal,
                        pickup_slot_id: slot_id,
                        notes: None,
                    },
                );
                manager.execute_command(cmd)
            })
        })
        .collect();

    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = responses.iter().filter(|r| r.success).count();
    assert_eq!(successes, 1, "exactly one reservation may win");

    for resp in responses.iter().filter(|r| !r.success) {
        let err = resp.error.as_ref().unwrap();
        assert_eq!(
            err.code,
            shared::request::CommandErrorCode::SlotUnavailable
        );
    }

    let slot = manager.storage().get_slot(&slot_id).unwrap().unwrap();
    assert_eq!(slot.consumed_count, 1);
}

#[test]
fn over_limit_request_succeeds_and_overrides_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    let slot_id = seed_slot(&manager, 10);

    for _ in 0..3 {
        create_request(&manager, "stu-7", &slot_id);
    }

    let (iso_year, iso_week) = iso_week_of(shared::util::now_millis());
    let key = WeekKey::new("stu-7", iso_year, iso_week);

    let ledger = UsageLedger::new(manager.storage().clone(), FREE_LIMIT);
    let counter = ledger.get_counter(&key).unwrap();
    assert_eq!(counter.request_count, 3);
    assert!(counter.exceeds_allowance(FREE_LIMIT));
    assert_eq!(counter.extra_charges, EXTRA_CHARGE);
    assert!(!counter.flagged);

    // Flagging does not touch the charge; charging does not touch the flag
    let flagged = ledger.set_flag(&key, true).unwrap();
    assert!(flagged.flagged);
    assert_eq!(flagged.extra_charges, EXTRA_CHARGE);

    let charged = ledger.set_extra_charge(&key, 30).unwrap();
    assert_eq!(charged.extra_charges, 30);
    assert!(charged.flagged);
    assert_eq!(charged.request_count, 3);
}

#[test]
fn cancel_releases_the_slot_for_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let manager = open_manager(dir.path());
    let slot_id = seed_slot(&manager, 1);

    let request_id = create_request(&manager, "stu-1", &slot_id);

    let resp = manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::CancelRequest {
            request_id: request_id.clone(),
            expected_status: RequestStatus::Created,
        },
    ));
    assert!(resp.success, "cancel failed: {:?}", resp.error);

    let slot = manager.storage().get_slot(&slot_id).unwrap().unwrap();
    assert_eq!(slot.consumed_count, 0);

    // The freed unit is immediately reusable
    create_request(&manager, "stu-2", &slot_id);

    // Cancelling again must not release anything twice
    let resp = manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::CancelRequest {
            request_id,
            expected_status: RequestStatus::Created,
        },
    ));
    assert!(!resp.success);
    assert_eq!(
        resp.error.unwrap().code,
        shared::request::CommandErrorCode::InvalidTransition
    );

    let slot = manager.storage().get_slot(&slot_id).unwrap().unwrap();
    assert_eq!(slot.consumed_count, 1);
}
