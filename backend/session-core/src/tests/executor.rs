use crate::backend::{BackendPaths, DebugBackend, OutputSink};
use crate::error::BackendError;
use crate::session::controller::Shared;
use crate::session::executor::Executor;

use common::RedactedPairingCode;

use std::sync::Arc;

use tokio::sync::mpsc;

/// Backend whose server start panics on the blocking pool.
struct PanickingBackend;

impl DebugBackend for PanickingBackend {
    fn initialize(&self, _paths: &BackendPaths) -> Result<(), BackendError> {
        Ok(())
    }

    fn start_server(&self) -> Result<String, BackendError> {
        panic!("backend crashed");
    }

    fn stop_server(&self) -> Result<String, BackendError> {
        Ok("Server stopped.".to_string())
    }

    fn pair(&self, address: &str, _code: &RedactedPairingCode) -> Result<String, BackendError> {
        Ok(format!("Successfully paired to {address}"))
    }

    fn connect(&self, address: &str) -> Result<String, BackendError> {
        Ok(format!("connected to {address}"))
    }

    fn disconnect(&self, _address: Option<&str>) -> Result<String, BackendError> {
        Ok("disconnected".to_string())
    }

    fn run_command_streaming(&self, _args: &[String], _output: &OutputSink) -> i32 {
        0
    }
}

/// **VALUE**: A backend call that dies on the blocking pool is reported with
/// the location of the operation that made the call.
///
/// **WHY THIS MATTERS**: Every error variant carries a location so log lines
/// point at the failing call site.
///
/// **BUG THIS CATCHES**: Capturing the location inside the call helper, so
/// every worker failure points at the same line.
#[tokio::test]
async fn given_panicking_backend_when_called_then_worker_error_points_at_caller() {
    // GIVEN: A worker over a backend that panics
    let shared = Shared::detached(Arc::new(PanickingBackend));
    let (_queue, rx) = mpsc::unbounded_channel();
    let executor = Executor::new(shared, rx);

    // WHEN: Calling the backend
    let call_line = line!() + 1;
    let result = executor.call(|backend| backend.start_server()).await;

    // THEN: The error names this file and line
    match result {
        Err(BackendError::Worker { message, location }) => {
            assert!(message.starts_with("Backend call did not complete"));
            assert!(location.file.ends_with("tests/executor.rs"));
            assert_eq!(location.line, call_line);
        }
        other => panic!("Expected a worker error, got {other:?}"),
    }
}

#[tokio::test]
async fn given_working_backend_when_called_then_message_returned() {
    let shared = Shared::detached(Arc::new(PanickingBackend));
    let (_queue, rx) = mpsc::unbounded_channel();
    let executor = Executor::new(shared, rx);

    let result = executor.call(|backend| backend.connect("127.0.0.1:5555")).await;

    assert_eq!(result.expect("connected"), "connected to 127.0.0.1:5555");
}
