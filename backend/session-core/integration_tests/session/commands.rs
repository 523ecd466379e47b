use crate::helpers::{FakeBackend, start_controller, start_running, wait_for};

use session_core::error::SessionError;
use session_core::{CommandMode, ConnectionState};

/// **VALUE**: A remote connect target is refused before it reaches the queue.
///
/// **WHY THIS MATTERS**: This is the core security guarantee of the host; the
/// backend must never be asked to dial another machine.
///
/// **BUG THIS CATCHES**: Validation running after submission, or rejections being
/// recorded as normal history entries.
#[tokio::test]
async fn given_remote_connect_when_run_then_rejected_without_reaching_backend() {
    // GIVEN: A running server
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    // WHEN: Running a direct connect to a public address
    let result = controller.run_command("connect 8.8.8.8:5555", CommandMode::Direct);
    controller.drain().await.expect("drained");

    // THEN: Security rejection, recorded as a failed command
    assert!(matches!(result, Err(SessionError::SecurityRejection { .. })));
    let state = controller.snapshot();
    assert_eq!(state.last_command.as_deref(), Some("adb connect 8.8.8.8:5555"));
    assert_eq!(state.last_command_exit_code, Some(1));
    assert_eq!(
        state.last_command_output,
        vec!["This app only connects to this device."]
    );
    assert_eq!(
        state.last_error.as_deref(),
        Some("This app only connects to this device.")
    );
    assert!(state.command_history.is_empty());
    assert_eq!(state.connection_state, ConnectionState::Idle);
    assert_eq!(backend.count("run"), 0);
    assert_eq!(state.logs.first().map(String::as_str), Some("Rejected command: adb connect 8.8.8.8:5555"));
}

#[tokio::test]
async fn given_loopback_connect_when_run_then_executed_and_connected() {
    let backend = FakeBackend::new();
    backend.script_command(vec!["connected to 127.0.0.1:5555".to_string()], 0);
    let controller = start_running(&backend).await;
    controller.update_command_input("connect 127.0.0.1:5555");

    controller
        .run_command("connect 127.0.0.1:5555", CommandMode::Direct)
        .expect("accepted");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(backend.count("run connect 127.0.0.1:5555"), 1);
    assert_eq!(state.connection_state, ConnectionState::Connected);
    assert_eq!(state.connect_address, "127.0.0.1:5555");
    assert_eq!(state.command_history, vec!["adb connect 127.0.0.1:5555"]);
    assert_eq!(state.command_input, "");
    assert_eq!(state.last_command_exit_code, Some(0));
    assert!(!state.command_running);
    assert_eq!(
        state.logs.first().map(String::as_str),
        Some("Command completed: adb connect 127.0.0.1:5555")
    );
}

#[tokio::test]
async fn given_blank_input_when_run_then_asks_for_a_command() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    let result = controller.run_command("   ", CommandMode::Direct);

    assert!(matches!(result, Err(SessionError::Validation { .. })));
    assert_eq!(
        controller.snapshot().last_error.as_deref(),
        Some("Type a command first.")
    );
    assert!(controller.snapshot().last_command.is_none());
    assert_eq!(controller.snapshot().logs[0], "Rejected command: empty input.");
}

#[tokio::test]
async fn given_stopped_server_when_run_then_rejected() {
    let backend = FakeBackend::new();
    let controller = start_controller(&backend).await;

    let result = controller.run_command("devices", CommandMode::Direct);

    assert!(matches!(result, Err(SessionError::Validation { .. })));
    let state = controller.snapshot();
    assert_eq!(state.last_error.as_deref(), Some("Start the server first."));
    assert_eq!(state.last_command.as_deref(), Some("adb devices"));
    assert_eq!(state.last_command_exit_code, Some(1));
}

/// **VALUE**: The output buffer keeps only the newest 200 lines, in arrival order.
///
/// **WHY THIS MATTERS**: Long-running commands (logcat, dumpsys) can stream
/// thousands of lines; memory must stay bounded.
///
/// **BUG THIS CATCHES**: Trimming from the tail instead of the head.
#[tokio::test]
async fn given_250_output_lines_when_command_runs_then_newest_200_kept() {
    // GIVEN: A command that prints 250 lines
    let backend = FakeBackend::new();
    let lines: Vec<String> = (0..250).map(|i| format!("line {i}")).collect();
    backend.script_command(lines, 0);
    let controller = start_running(&backend).await;

    // WHEN: Running it
    controller
        .run_command("logcat -d", CommandMode::Shell)
        .expect("accepted");
    controller.drain().await.expect("drained");

    // THEN: 200 lines, oldest first
    let output = controller.snapshot().last_command_output;
    assert_eq!(output.len(), 200);
    assert_eq!(output.first().map(String::as_str), Some("line 50"));
    assert_eq!(output.last().map(String::as_str), Some("line 249"));
}

#[tokio::test]
async fn given_command_output_when_completed_then_first_lines_are_mirrored_into_logs() {
    let backend = FakeBackend::new();
    let lines: Vec<String> = (0..20).map(|i| format!("out {i}")).collect();
    backend.script_command(lines, 0);
    let controller = start_running(&backend).await;

    controller
        .run_command("getprop", CommandMode::Shell)
        .expect("accepted");
    controller.drain().await.expect("drained");

    let logs = controller.snapshot().logs;
    assert_eq!(logs[0], "Command completed: adb shell getprop");
    assert_eq!(logs[1], "out 11");
    assert_eq!(logs[12], "out 0");
    assert_eq!(logs[13], "Command running: adb shell getprop");
    assert!(!logs.contains(&"out 12".to_string()));
}

#[tokio::test]
async fn given_blank_and_padded_output_when_streamed_then_blank_lines_skipped_and_trimmed() {
    let backend = FakeBackend::new();
    backend.script_command(
        vec!["first   ".to_string(), "   ".to_string(), String::new(), "second".to_string()],
        0,
    );
    let controller = start_running(&backend).await;

    controller.run_command("devices", CommandMode::Direct).expect("accepted");
    controller.drain().await.expect("drained");

    assert_eq!(controller.snapshot().last_command_output, vec!["first", "second"]);
}

#[tokio::test]
async fn given_non_zero_exit_when_command_completes_then_error_without_state_change() {
    let backend = FakeBackend::new();
    backend.script_command(vec!["error: no devices".to_string()], 1);
    let controller = start_running(&backend).await;

    controller.run_command("devices", CommandMode::Direct).expect("accepted");
    controller.drain().await.expect("drained");

    let state = controller.snapshot();
    assert_eq!(state.last_command_exit_code, Some(1));
    assert_eq!(state.last_error.as_deref(), Some("Command failed with exit code 1."));
    assert_eq!(state.logs[0], "Command failed: adb devices");
    assert_eq!(state.connection_state, ConnectionState::Idle);
}

#[tokio::test]
async fn given_failed_connect_command_when_completed_then_error_state() {
    let backend = FakeBackend::new();
    backend.script_command(vec!["failed to connect".to_string()], 1);
    let controller = start_running(&backend).await;

    controller
        .run_command("connect 127.0.0.1:5555", CommandMode::Direct)
        .expect("accepted");
    controller.drain().await.expect("drained");

    assert_eq!(controller.snapshot().connection_state, ConnectionState::Error);
}

#[tokio::test]
async fn given_shell_mode_when_run_then_history_and_args_use_shell_form() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    controller
        .run_command("echo 'a b'", CommandMode::Shell)
        .expect("accepted");
    controller.drain().await.expect("drained");

    assert_eq!(backend.count("run shell echo a b"), 1);
    assert_eq!(
        controller.snapshot().command_history,
        vec!["adb shell echo 'a b'"]
    );
}

#[tokio::test]
async fn given_completed_command_when_output_cleared_then_command_fields_reset() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;
    controller.run_command("devices", CommandMode::Direct).expect("accepted");
    controller.drain().await.expect("drained");

    controller.clear_command_output();

    let state = controller.snapshot();
    assert!(state.last_command.is_none());
    assert!(state.last_command_exit_code.is_none());
    assert!(state.last_command_output.is_empty());
    assert_eq!(state.command_history, vec!["adb devices"]);
}

/// **VALUE**: Commands run strictly in submission order.
///
/// **WHY THIS MATTERS**: The queue is what stops a connect from racing an
/// in-flight pair.
///
/// **BUG THIS CATCHES**: Spawning a task per operation instead of draining one
/// queue.
#[tokio::test]
async fn given_many_submissions_when_drained_then_backend_saw_them_in_order() {
    let backend = FakeBackend::new();
    let controller = start_running(&backend).await;

    for i in 0..10 {
        controller
            .run_command(&format!("echo {i}"), CommandMode::Shell)
            .expect("accepted");
    }
    controller.drain().await.expect("drained");

    let runs: Vec<String> = backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("run"))
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("run shell echo {i}")).collect();
    assert_eq!(runs, expected);
}

/// **VALUE**: A command queued behind a running one starts from clean buffers
/// and the running command keeps its own until it finishes.
///
/// **WHY THIS MATTERS**: Observers read `last_command`, its exit code and its
/// output together; mixing two commands in them misreports both.
///
/// **BUG THIS CATCHES**: Resetting the command buffers at submission time, so
/// the earlier command's late output and exit code land on the later one.
#[tokio::test]
async fn given_streaming_command_when_second_command_submitted_then_outputs_stay_separate() {
    // GIVEN: A first command that stalls after one line
    let backend = FakeBackend::new();
    backend.queue_command(vec!["A1".to_string(), "A2".to_string()], 7);
    backend.queue_command(vec!["B1".to_string()], 0);
    let gate = backend.gate_command();
    let controller = start_running(&backend).await;
    let mut states = controller.subscribe();

    controller
        .run_command("devices", CommandMode::Direct)
        .expect("accepted");
    wait_for(&mut states, |s| s.last_command_output.contains(&"A1".to_string())).await;

    // WHEN: A second command is submitted while the first is still streaming
    controller
        .run_command("version", CommandMode::Direct)
        .expect("accepted");

    // THEN: The first command still owns the buffers
    let waiting = controller.snapshot();
    assert_eq!(waiting.last_command.as_deref(), Some("adb devices"));
    assert!(waiting.command_running);
    assert_eq!(waiting.last_command_exit_code, None);
    assert_eq!(waiting.command_history[0], "adb version");

    gate.send(()).expect("gate open");
    controller.drain().await.expect("drained");

    // THEN: The second command reports only its own result
    let state = controller.snapshot();
    assert_eq!(state.last_command.as_deref(), Some("adb version"));
    assert_eq!(state.last_command_exit_code, Some(0));
    assert_eq!(state.last_command_output, vec!["B1".to_string()]);
    assert!(!state.command_running);

    let position = |line: &str| state.logs.iter().position(|l| l == line);
    let first_failed = position("Command failed: adb devices").expect("first logged");
    let second_running = position("Command running: adb version").expect("second logged");
    assert!(second_running < first_failed);
}
