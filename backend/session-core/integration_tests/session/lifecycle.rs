use crate::helpers::{
    FakeBackend, RecordingSink, start_controller, start_controller_with, start_running,
    test_options,
};

use session_core::error::SessionError;
use session_core::{CommandMode, ConnectionState};

use common::RedactedPairingCode;

use std::sync::Arc;

#[tokio::test]
async fn given_new_controller_when_started_then_backend_initialized_once_and_idle() {
    let backend = FakeBackend::new();

    let controller = start_controller(&backend).await;

    assert!(controller.is_backend_available());
    assert_eq!(backend.calls(), vec!["initialize"]);
    assert_eq!(controller.snapshot().connection_state, ConnectionState::Idle);
}

/// **VALUE**: A backend that cannot initialize leaves every operation short-circuited.
///
/// **WHY THIS MATTERS**: Without adb the app must still come up and explain
/// what is wrong instead of queueing calls that can never succeed.
///
/// **BUG THIS CATCHES**: Operations reaching a backend that never initialized.
#[tokio::test]
async fn given_failed_initialization_when_operations_requested_then_unavailable() {
    // GIVEN: A backend whose initialization fails
    let backend = FakeBackend::failing_init();
    let controller = start_controller(&backend).await;

    // THEN: Error state with the initialization message
    let state = controller.snapshot();
    assert!(!controller.is_backend_available());
    assert_eq!(state.connection_state, ConnectionState::Error);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Failed to initialize the native adb backend.")
    );

    // WHEN/THEN: Every backend operation is refused
    assert!(matches!(
        controller.start_server(),
        Err(SessionError::BackendUnavailable { .. })
    ));
    assert_eq!(
        controller.snapshot().logs[0],
        "Server start failed: backend not wired."
    );
    assert!(matches!(
        controller.request_pair("127.0.0.1:5557", RedactedPairingCode::new("123456")),
        Err(SessionError::BackendUnavailable { .. })
    ));
    assert!(matches!(
        controller.request_connect("127.0.0.1:5555"),
        Err(SessionError::BackendUnavailable { .. })
    ));
    assert!(matches!(
        controller.request_disconnect(),
        Err(SessionError::BackendUnavailable { .. })
    ));
    assert!(matches!(
        controller.run_command("devices", CommandMode::Direct),
        Err(SessionError::BackendUnavailable { .. })
    ));
    assert_eq!(
        controller.snapshot().last_error.as_deref(),
        Some("ADB backend isn't available in this build.")
    );

    controller.drain().await.expect("drained");
    assert_eq!(backend.calls(), vec!["initialize"]);
}

#[tokio::test]
async fn given_running_server_when_started_again_then_state_kept() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.request_connect("127.0.0.1:5555").expect("queued");
    controller.drain().await.expect("drained");

    controller.start_server().expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Connected);
    assert_eq!(state.logs[0], "Server already running.");
}

/// **VALUE**: Stopping an already stopped server is harmless and logs once per call.
///
/// **WHY THIS MATTERS**: Stop is wired to buttons and shutdown hooks that can
/// fire repeatedly.
///
/// **BUG THIS CATCHES**: Treating "already stopped" as a failure (moving to
/// Error) or logging duplicate lines.
#[tokio::test]
async fn given_stopped_server_when_stopped_twice_then_idle_and_one_log_per_call() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    controller.stop_server().expect("queued");
    controller.stop_server().expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Idle);
    assert!(!state.server_running);
    assert_eq!(
        state.logs,
        vec!["Server already stopped.", "Server already stopped."]
    );
}

#[tokio::test]
async fn given_connected_session_when_server_stopped_then_idle() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.request_connect("127.0.0.1:5555").expect("queued");

    controller.stop_server().expect("queued");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Idle);
    assert!(!state.server_running);
    assert_eq!(state.logs[0], "Server stopped.");
}

#[tokio::test]
async fn given_45_log_events_when_logged_then_40_newest_kept() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    for i in 0..45 {
        controller.log_info(format!("event {i}"));
    }

    let logs = controller.snapshot().logs;
    assert_eq!(logs.len(), 40);
    assert_eq!(logs[0], "event 44");
    assert_eq!(logs[39], "event 5");
}

#[tokio::test]
async fn given_field_edit_when_applied_then_last_error_cleared() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;
    controller.report_error("Something went wrong");
    assert!(controller.snapshot().last_error.is_some());

    controller.update_pairing_address("127.0.0.1:37000");

    let state = controller.snapshot();
    assert!(state.last_error.is_none());
    assert_eq!(state.pairing_address, "127.0.0.1:37000");
}

#[tokio::test]
async fn given_reported_error_when_reported_then_connection_state_unchanged() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    controller.report_error("Notification permission is required for pairing input.");

    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Idle);
    controller.clear_error();
    assert!(controller.snapshot().last_error.is_none());
}

#[tokio::test]
async fn given_status_sink_when_operations_finish_then_it_is_refreshed() {
    let backend = FakeBackend::new();
    let sink = Arc::new(RecordingSink::default());
    let controller =
        start_controller_with(&backend, test_options().with_status_sink(sink.clone())).await;

    controller.start_server().expect("queued");
    controller.drain().await.expect("drained");

    let summaries = sink.summaries.lock().unwrap().clone();
    let last = summaries.last().expect("refreshed");
    assert_eq!(last.title, "ADB Host");
    assert_eq!(last.text, "Server running · Idle");
}

#[tokio::test]
async fn given_shutdown_when_operations_submitted_then_actor_error() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    let other_handle = controller.clone();

    controller.shutdown().await.expect("clean shutdown");
    other_handle.shutdown().await.expect("second shutdown is a no-op");

    assert!(matches!(
        other_handle.start_server(),
        Err(SessionError::Actor { .. })
    ));
    assert!(matches!(other_handle.drain().await, Err(SessionError::Actor { .. })));
}

#[tokio::test]
async fn given_queued_work_when_shut_down_then_work_finishes_first() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    controller.run_command("devices", CommandMode::Direct).expect("accepted");
    controller.shutdown().await.expect("clean shutdown");

    assert_eq!(backend.count("run devices"), 1);
    assert_eq!(controller.snapshot().last_command_exit_code, Some(0));
}
