// Unit tests for the host error type

use crate::error::AdbHostError;

use session_core::error::SessionError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Session errors keep their user-facing text when wrapped.
///
/// **WHY THIS MATTERS**: The binary prints these at exit; the location suffix of
/// the inner error is noise, the message is what the user acts on.
///
/// **BUG THIS CATCHES**: Would catch if the conversion used the inner `Display`
/// (with its location) or lost the message entirely.
#[test]
fn given_session_error_when_converted_then_core_variant_keeps_message() {
    // GIVEN: A worker error from the session
    let inner = SessionError::Actor {
        message: String::from("The session worker is not running."),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Converting
    let err = AdbHostError::from(inner);

    // THEN: Core variant with the plain message
    match err {
        AdbHostError::Core { message, .. } => {
            assert_eq!(message, "The session worker is not running.");
        }
        other => panic!("expected Core, got {other:?}"),
    }
}

#[test]
fn given_console_error_when_displayed_then_prefixed_with_kind() {
    let err = AdbHostError::console("Unknown command :foo");

    let text = err.to_string();

    assert!(text.starts_with("Console Error: Unknown command :foo"));
}

#[test]
fn given_io_error_when_converted_then_adbhost_variant() {
    let io = std::io::Error::other("stdin closed");

    let err = AdbHostError::from(io);

    assert!(matches!(err, AdbHostError::AdbHost { ref message, .. } if message == "stdin closed"));
}
