//! Client tests against a mocked ledger.

use std::time::Duration;

use common::{BookId, ReceiptId, ReceiptStatus, UserId};
use httpmock::Method::PATCH;
use httpmock::prelude::*;
use receipt_client::{ClientConfig, ReceiptClientError, ReceiptGateway, RemoteReceiptClient};
use serde_json::{Value, json};

fn receipt_json(id: u64, user_id: u64, book_id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "book_id": book_id,
        "status": status,
        "due_date": "2026-10-30T12:00:00Z",
        "created_at": "2026-10-16T12:00:00Z",
        "updated_at": "2026-10-16T12:00:00Z",
        "deleted_at": null
    })
}

fn client_for(server: &MockServer) -> RemoteReceiptClient {
    RemoteReceiptClient::new(ClientConfig::new(server.base_url())).unwrap()
}

#[tokio::test]
async fn test_place_created() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/receipts")
                .json_body(json!({ "user_id": 7, "book_id": 3 }));
            then.status(201).json_body(receipt_json(11, 7, 3, "pending"));
        })
        .await;

    let placed = client_for(&server)
        .place(UserId::new(7), BookId::new(3), None)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(!placed.replayed);
    assert_eq!(placed.receipt.id, ReceiptId::new(11));
    assert_eq!(placed.receipt.status, ReceiptStatus::Pending);
    assert!(placed.receipt.book.is_none());
}

#[tokio::test]
async fn test_place_sends_idempotency_key_and_accepts_replay() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/receipts")
                .header("idempotency-key", "req-9");
            then.status(200).json_body(receipt_json(11, 7, 3, "pending"));
        })
        .await;

    let placed = client_for(&server)
        .place(UserId::new(7), BookId::new(3), Some("req-9"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(placed.replayed);
    assert_eq!(placed.receipt.id, ReceiptId::new(11));
}

#[tokio::test]
async fn test_place_conflict_carries_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/receipts");
            then.status(409)
                .json_body(json!({ "error": "book 3 not available" }));
        })
        .await;

    let err = client_for(&server)
        .place(UserId::new(7), BookId::new(3), None)
        .await
        .unwrap_err();

    match err {
        ReceiptClientError::Conflict(message) => assert_eq!(message, "book 3 not available"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_place_server_error_is_remote() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/receipts");
            then.status(500).body("database unavailable");
        })
        .await;

    let err = client_for(&server)
        .place(UserId::new(7), BookId::new(3), None)
        .await
        .unwrap_err();

    assert_eq!(err.remote_status(), Some(500));
    assert!(err.to_string().contains("database unavailable"));
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/receipts");
            then.status(201).body("not json");
        })
        .await;

    let err = client_for(&server)
        .place(UserId::new(7), BookId::new(3), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptClientError::Decode(_)));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/receipts");
            then.status(201)
                .delay(Duration::from_millis(500))
                .json_body(receipt_json(11, 7, 3, "pending"));
        })
        .await;

    let client = RemoteReceiptClient::new(
        ClientConfig::new(server.base_url()).with_timeout(Duration::from_millis(50)),
    )
    .unwrap();
    let err = client
        .place(UserId::new(7), BookId::new(3), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptClientError::Transport(_)));
    assert_eq!(err.remote_status(), None);
}

#[tokio::test]
async fn test_cancel_sends_canceled_status() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/receipts/11/status")
                .json_body(json!("canceled"));
            then.status(200)
                .json_body(json!({ "message": "Receipt 11 status updated to canceled" }));
        })
        .await;

    client_for(&server)
        .cancel(ReceiptId::new(11))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_cancel_missing_receipt() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/receipts/99/status");
            then.status(404)
                .json_body(json!({ "error": "Receipt not found: 99" }));
        })
        .await;

    let err = client_for(&server)
        .cancel(ReceiptId::new(99))
        .await
        .unwrap_err();

    assert_eq!(err.remote_status(), Some(404));
}

#[tokio::test]
async fn test_cancel_closed_receipt_conflicts() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/receipts/11/status");
            then.status(409).json_body(
                json!({ "error": "receipt 11 is returned and cannot be canceled" }),
            );
        })
        .await;

    let err = client_for(&server)
        .cancel(ReceiptId::new(11))
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptClientError::Conflict(ref m) if m.contains("cannot be canceled")));
}

#[tokio::test]
async fn test_list_for_user() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/receipts/user/7");
            then.status(200).json_body(json!([
                receipt_json(11, 7, 3, "pending"),
                receipt_json(12, 7, 4, "owned"),
            ]));
        })
        .await;

    let receipts = client_for(&server)
        .list_for_user(UserId::new(7))
        .await
        .unwrap();

    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[1].status, ReceiptStatus::Owned);
}
