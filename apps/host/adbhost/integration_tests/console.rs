use adbhost::console::{ConsoleCommand, Flow, dispatch, parse_line};
use adbhost::error::AdbHostError;

use session_core::backend::{BackendPaths, ProcessBackend};
use session_core::{ConnectionState, SessionController, SessionOptions};

use std::sync::Arc;

use tempfile::TempDir;

async fn controller_without_adb(dir: &TempDir) -> SessionController {
    let backend = Arc::new(ProcessBackend::new("/nonexistent/adbhost-test/adb"));
    let paths = BackendPaths::new(dir.path().join("base"), dir.path().join("cache"));
    SessionController::start(backend, SessionOptions::new(paths)).await
}

/// **VALUE**: Console lines reach the session, and rejections do not end the
/// console.
///
/// **WHY THIS MATTERS**: Without adb installed every request is refused; the
/// user still needs a working prompt to read why.
///
/// **BUG THIS CATCHES**: Would catch rejections being propagated as fatal
/// errors out of the console loop.
#[tokio::test]
async fn given_missing_adb_when_console_commands_dispatched_then_rejected_but_continues() {
    // GIVEN: A controller whose backend cannot initialize
    let dir = TempDir::new().expect("temp dir");
    let controller = controller_without_adb(&dir).await;
    assert!(!controller.is_backend_available());

    // WHEN: Starting the server and running a command from the console
    let start = dispatch(&controller, parse_line(":start").expect("parsed")).expect("dispatched");
    let run = dispatch(&controller, parse_line("devices").expect("parsed")).expect("dispatched");

    // THEN: Both keep the console alive, and the session explains why
    assert_eq!(start, Flow::Continue);
    assert_eq!(run, Flow::Continue);
    let state = controller.snapshot();
    assert_eq!(state.connection_state, ConnectionState::Error);
    assert_eq!(
        state.last_error.as_deref(),
        Some("ADB backend isn't available in this build.")
    );
    assert_eq!(state.last_command.as_deref(), Some("adb devices"));

    controller.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn given_clear_directive_when_dispatched_then_output_and_error_cleared() {
    let dir = TempDir::new().expect("temp dir");
    let controller = controller_without_adb(&dir).await;
    dispatch(&controller, parse_line("devices").expect("parsed")).expect("dispatched");

    dispatch(&controller, ConsoleCommand::Clear).expect("dispatched");

    let state = controller.snapshot();
    assert!(state.last_error.is_none());
    assert!(state.last_command.is_none());
    assert!(state.last_command_output.is_empty());

    controller.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn given_quit_directive_when_dispatched_then_console_stops() {
    let dir = TempDir::new().expect("temp dir");
    let controller = controller_without_adb(&dir).await;

    let flow = dispatch(&controller, ConsoleCommand::Quit).expect("dispatched");

    assert_eq!(flow, Flow::Quit);
    controller.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn given_stopped_worker_when_drained_then_core_error() {
    let dir = TempDir::new().expect("temp dir");
    let controller = controller_without_adb(&dir).await;
    controller.shutdown().await.expect("shutdown");

    let drained = controller.drain().await;

    let err = AdbHostError::from(drained.expect_err("worker gone"));
    assert!(matches!(err, AdbHostError::Core { ref message, .. } if message == "The session worker is not running."));
}
