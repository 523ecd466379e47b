use crate::backend::process::tcp_port;
use crate::backend::{BackendPaths, DebugBackend, OutputSink, ProcessBackend};
use crate::error::BackendError;

use tempfile::TempDir;

#[test]
fn given_socket_specs_when_port_extracted_then_only_tcp_has_one() {
    assert_eq!(tcp_port("tcp:5037"), Some(5037));
    assert_eq!(tcp_port("tcp:localhost:5038"), Some(5038));
    assert_eq!(tcp_port("localabstract:adbhost"), None);
    assert_eq!(tcp_port("tcp:nope"), None);
}

/// **VALUE**: A missing executable makes the backend unavailable instead of panicking.
///
/// **WHY THIS MATTERS**: The session must come up in Error with a readable
/// message when adb is not installed.
///
/// **BUG THIS CATCHES**: Reporting a missing binary as a generic IO error, which
/// would not map to the backend-unavailable path.
#[test]
fn given_missing_executable_when_initialized_then_unavailable() {
    let dir = TempDir::new().expect("temp dir");
    let backend = ProcessBackend::new(dir.path().join("no-such-adb"));
    let paths = BackendPaths::new(dir.path().join("base"), dir.path().join("cache"));

    let result = backend.initialize(&paths);

    assert!(matches!(result, Err(BackendError::Unavailable { .. })));
    assert!(dir.path().join("base").join(".android").is_dir());
}

#[test]
fn given_uninitialized_backend_when_called_then_unavailable() {
    let backend = ProcessBackend::default();

    assert!(matches!(
        backend.start_server(),
        Err(BackendError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn given_uninitialized_backend_when_command_streamed_then_error_line_and_minus_one() {
    let backend = ProcessBackend::default();
    let (sink, mut rx) = OutputSink::channel();

    let code = backend.run_command_streaming(&["devices".to_string()], &sink);
    drop(sink);

    assert_eq!(code, -1);
    let line = rx.recv().await.expect("error line");
    assert!(line.starts_with("error: "));
}
