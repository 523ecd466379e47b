use crate::helpers::{FakeBackend, start_running, wait_for};

use session_core::ConnectionState;
use session_core::error::SessionError;

use common::RedactedPairingCode;

/// **VALUE**: The full happy path: pair, then connect automatically.
///
/// **WHY THIS MATTERS**: Users pair from a notification and expect the device to
/// be usable without a second action.
///
/// **BUG THIS CATCHES**: Skipping the Pairing state, or the auto-connect never
/// firing once pairing succeeds.
#[tokio::test]
async fn given_known_connect_address_when_pairing_succeeds_then_connects_automatically() {
    // GIVEN: A running server and a known local connect address
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.update_connect_address("127.0.0.1:5555");
    let gate = backend.gate_pair();
    let mut states = controller.subscribe();

    // WHEN: Pairing
    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("123456"))
        .expect("queued");

    // THEN: Pairing is observable while the backend call is in flight
    let pairing = wait_for(&mut states, |s| s.connection_state == ConnectionState::Pairing).await;
    assert_eq!(pairing.pairing_address, "127.0.0.1:5557");

    gate.send(()).expect("gate open");
    controller.drain().await.expect("drained");

    // THEN: Paired, then Connected without another request
    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Connected);
    assert_eq!(
        backend.calls(),
        vec![
            "initialize",
            "start_server",
            "pair 127.0.0.1:5557 123456",
            "connect 127.0.0.1:5555"
        ]
    );
    assert!(state.logs.contains(&"Successfully paired to 127.0.0.1:5557".to_string()));
    assert_eq!(state.logs[0], "connected to 127.0.0.1:5555");
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn given_no_connect_address_when_pairing_succeeds_then_stays_paired() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("123456"))
        .expect("queued");
    controller.drain().await.expect("drained");

    assert_eq!(controller.snapshot().connection_state, ConnectionState::Paired);
    assert_eq!(backend.count("connect"), 0);
}

/// **VALUE**: A connect address detected after pairing still gets its one auto-connect.
///
/// **WHY THIS MATTERS**: The connect service is often advertised a moment after
/// pairing completes.
///
/// **BUG THIS CATCHES**: Consuming the auto-connect flag when its preconditions
/// were not met, or retrying it more than once.
#[tokio::test]
async fn given_pending_auto_connect_when_connect_address_detected_then_connects_once() {
    // GIVEN: Paired with no connect address
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("123456"))
        .expect("queued");
    controller.drain().await.expect("drained");

    // WHEN: The connect service shows up (twice)
    controller.set_detected_connect_address("127.0.0.1:5555");
    controller.drain().await.expect("drained");
    controller.set_detected_connect_address("127.0.0.1:5555");
    controller.drain().await.expect("drained");

    // THEN: Exactly one connect
    assert_eq!(backend.count("connect"), 1);
    assert_eq!(controller.snapshot().connection_state, ConnectionState::Connected);
}

#[tokio::test]
async fn given_remote_detected_connect_address_when_pending_then_auto_connect_waits() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("123456"))
        .expect("queued");
    controller.drain().await.expect("drained");

    controller.set_detected_connect_address("10.1.2.3:5555");
    controller.drain().await.expect("drained");
    assert_eq!(backend.count("connect"), 0);

    controller.set_detected_connect_address("127.0.0.1:5555");
    controller.drain().await.expect("drained");
    assert_eq!(backend.count("connect"), 1);
}

#[tokio::test]
async fn given_backend_pair_failure_when_pairing_then_error_state_and_message() {
    let backend = FakeBackend::new();
    backend.fail_pair("  Wrong pairing code  ");
    let controller = start_running(&backend).await;
    controller.update_connect_address("127.0.0.1:5555");

    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("000000"))
        .expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Error);
    assert_eq!(state.last_error.as_deref(), Some("Wrong pairing code"));
    assert_eq!(state.logs[0], "Pairing failed for 127.0.0.1:5557.");
    assert_eq!(backend.count("connect"), 0);
}

#[tokio::test]
async fn given_error_state_when_connect_succeeds_then_error_is_cleared() {
    let backend = FakeBackend::new();
    backend.fail_pair("Wrong pairing code");
    let controller = start_running(&backend).await;
    controller
        .request_pair("127.0.0.1:5557", RedactedPairingCode::new("000000"))
        .expect("queued");
    controller.drain().await.expect("drained");

    controller.request_connect("127.0.0.1:5555").expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Connected);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn given_remote_pair_target_when_requested_then_security_rejection() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    let result = controller.request_pair("8.8.8.8:5557", RedactedPairingCode::new("123456"));
    controller.drain().await.expect("drained");

    assert!(matches!(result, Err(SessionError::SecurityRejection { .. })));
    assert_eq!(backend.count("pair"), 0);
    let state = controller.snapshot();
    assert_eq!(
        state.last_error.as_deref(),
        Some("Only connections to this device are allowed.")
    );
    assert_eq!(state.connection_state, ConnectionState::Idle);
}

#[tokio::test]
async fn given_connected_session_when_disconnect_requested_then_uses_connect_address() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.request_connect("127.0.0.1:5555").expect("queued");
    controller.drain().await.expect("drained");

    controller.request_disconnect().expect("queued");
    controller.drain().await.expect("drained");

    assert_eq!(backend.count("disconnect 127.0.0.1:5555"), 1);
    assert_eq!(controller.snapshot().connection_state, ConnectionState::Idle);
}

#[tokio::test]
async fn given_backend_connect_failure_when_connecting_then_error_state() {
    let backend = FakeBackend::new();
    backend.fail_connect("failed to connect to 127.0.0.1:5555");
    let controller = start_running(&backend).await;

    controller.request_connect("127.0.0.1:5555").expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Error);
    assert_eq!(state.logs[0], "Connect failed for 127.0.0.1:5555.");
}

/// **VALUE**: Reply-style input is checked before it can trigger pairing.
///
/// **WHY THIS MATTERS**: The reply comes from a system prompt outside the app;
/// it is untrusted text.
///
/// **BUG THIS CATCHES**: Pairing with a malformed code or without a detected
/// pairing service.
#[tokio::test]
async fn given_pairing_replies_when_submitted_then_validated_before_pairing() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    // Empty input
    let result = controller.submit_pairing_reply("  ");
    assert!(matches!(result, Err(SessionError::Validation { .. })));
    assert_eq!(controller.snapshot().last_error.as_deref(), Some("Pairing input is empty."));

    // No pairing address yet
    let result = controller.submit_pairing_reply("123456");
    assert!(matches!(result, Err(SessionError::Validation { .. })));
    assert_eq!(
        controller.snapshot().last_error.as_deref(),
        Some("Pairing code required. Make sure the pairing service is detected.")
    );

    // Wrong shape
    controller.set_detected_pairing_address("127.0.0.1:37000");
    for input in ["12345", "1234567", "12345a", "１２３４５６"] {
        assert!(controller.submit_pairing_reply(input).is_err(), "input: {input}");
    }

    // Remote pairing address
    controller.set_detected_pairing_address("8.8.8.8:37000");
    let result = controller.submit_pairing_reply("123456");
    assert!(matches!(result, Err(SessionError::SecurityRejection { .. })));

    controller.drain().await.expect("drained");
    assert_eq!(backend.count("pair"), 0);
    assert_eq!(controller.snapshot().logs[0], "Pairing rejected: non-local address.");
}

#[tokio::test]
async fn given_valid_reply_with_detected_address_when_submitted_then_pairs() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.set_detected_pairing_address("127.0.0.1:37000");

    controller.submit_pairing_reply(" 654321 ").expect("queued");
    controller.drain().await.expect("drained");

    assert_eq!(backend.count("pair 127.0.0.1:37000 654321"), 1);
    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Paired);
    assert_eq!(state.pairing_code.expose(), "654321");
}
