use super::*;
use shared::models::PickupSlot;
use shared::request::{ClothesType, RequestEventType};

fn create_test_manager() -> RequestManager {
    let storage = RequestStorage::open_in_memory().unwrap();
    RequestManager::with_storage(storage, 2, 10)
}

/// Seed a pickup slot directly into storage
fn seed_slot(manager: &RequestManager, slot_id: &str, capacity: u32) {
    let slot = PickupSlot {
        slot_id: slot_id.to_string(),
        hostel_block: "B".to_string(),
        date: "2025-03-05".to_string(),
        start_time: 0,
        end_time: 3_600_000,
        capacity,
        consumed_count: 0,
        assigned_staff: None,
        is_active: true,
        created_at: 0,
        updated_at: 0,
    };
    let txn = manager.storage().begin_write().unwrap();
    manager.storage().store_slot(&txn, &slot).unwrap();
    txn.commit().unwrap();
}

fn create_request_cmd(student_id: &str, slot_id: &str) -> RequestCommand {
    RequestCommand::new(
        student_id.to_string(),
        "Test Student".to_string(),
        RequestCommandPayload::CreateRequest {
            student_id: student_id.to_string(),
            clothes_type: ClothesType::Normal,
            pickup_slot_id: slot_id.to_string(),
            notes: None,
        },
    )
}

/// Helper: create a request, asserting success
fn create_request(manager: &RequestManager, student_id: &str, slot_id: &str) -> String {
    let resp = manager.execute_command(create_request_cmd(student_id, slot_id));
    assert!(resp.success, "Failed to create request: {:?}", resp.error);
    resp.request_id.unwrap()
}

/// Helper: confirm pickup with the request's stored QR token
fn confirm_pickup(manager: &RequestManager, request_id: &str) -> CommandResponse {
    let snapshot = manager.get_snapshot(request_id).unwrap().unwrap();
    manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::ConfirmPickup {
            request_id: request_id.to_string(),
            presented_code: snapshot.qr_code.value.clone(),
            expected_status: snapshot.status,
        },
    ))
}

/// Helper: advance along a manual edge
fn advance(
    manager: &RequestManager,
    request_id: &str,
    from: RequestStatus,
    to: RequestStatus,
) -> CommandResponse {
    manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Laundry Staff".to_string(),
        RequestCommandPayload::AdvanceStatus {
            request_id: request_id.to_string(),
            target_status: to,
            expected_status: from,
        },
    ))
}

/// Helper: confirm delivery with the request's stored OTP
fn confirm_delivery(manager: &RequestManager, request_id: &str, otp: &str) -> CommandResponse {
    manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::ConfirmDelivery {
            request_id: request_id.to_string(),
            presented_otp: otp.to_string(),
            expected_status: RequestStatus::Ready,
        },
    ))
}

/// Helper: cancel a request
fn cancel(manager: &RequestManager, request_id: &str, expected: RequestStatus) -> CommandResponse {
    manager.execute_command(RequestCommand::new(
        "admin-1".to_string(),
        "Front Desk".to_string(),
        RequestCommandPayload::CancelRequest {
            request_id: request_id.to_string(),
            expected_status: expected,
        },
    ))
}

/// Helper: drive a request from Created all the way to Ready, returning
/// the issued OTP
fn bring_to_ready(manager: &RequestManager, request_id: &str) -> String {
    assert!(confirm_pickup(manager, request_id).success);
    assert!(advance(manager, request_id, RequestStatus::PickedUp, RequestStatus::Washing).success);
    assert!(advance(manager, request_id, RequestStatus::Washing, RequestStatus::Drying).success);
    assert!(advance(manager, request_id, RequestStatus::Drying, RequestStatus::Ready).success);
    let snapshot = manager.get_snapshot(request_id).unwrap().unwrap();
    snapshot.otp.expect("OTP should be issued at Ready").value
}

/// Assert the stored status of a request
fn assert_status(manager: &RequestManager, request_id: &str, expected: RequestStatus) {
    let snapshot = manager.get_snapshot(request_id).unwrap().unwrap();
    assert_eq!(
        snapshot.status, expected,
        "Expected request status {:?}, got {:?}",
        expected, snapshot.status
    );
}

/// Verify the stored snapshot matches a rebuild from the event stream
fn assert_snapshot_consistent(manager: &RequestManager, request_id: &str) {
    let stored = manager.get_snapshot(request_id).unwrap().unwrap();
    let rebuilt = manager.rebuild_snapshot(request_id).unwrap();
    assert_eq!(
        stored.status, rebuilt.status,
        "Snapshot diverged from event replay"
    );
    assert_eq!(stored.qr_code, rebuilt.qr_code);
    assert_eq!(stored.otp, rebuilt.otp);
    assert_eq!(stored.last_sequence, rebuilt.last_sequence);
}
