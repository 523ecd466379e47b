// Unit tests for logger initialization

use crate::error::AdbHostError;
use crate::logger::{LOG_FILE_NAME, initialize, initialize_internal};

use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Calling initialize() more than once neither panics nor fails.
///
/// **WHY THIS MATTERS**: Startup paths and tests can both reach the logger; fern
/// refuses a second global logger, so the guard is what keeps that from crashing.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards were
/// removed.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A writable directory
    let temp_dir = TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let first = initialize(temp_dir.path());
    let second = initialize(temp_dir.path());

    // THEN: Both Ok
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(second.is_ok(), "Second initialization should be a no-op");
}

/// **VALUE**: An unusable log directory is reported, not a panic.
///
/// **WHY THIS MATTERS**: The data directory can be missing or read-only; the
/// binary has to exit with a clear message.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` were unwrapped.
#[test]
#[serial]
fn given_invalid_log_dir_when_initialized_then_returns_error() {
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    let result = initialize_internal(&invalid_dir);

    match result {
        Err(AdbHostError::AdbHost { message, .. }) => {
            assert!(message.contains(LOG_FILE_NAME), "message: {message}");
        }
        other => panic!("expected AdbHost error, got {other:?}"),
    }
}
