use crate::console::{ConsoleCommand, fresh_log_lines, fresh_output_lines, parse_line, status_report};
use crate::error::AdbHostError;

use session_core::{CommandMode, ConnectionState, SessionState};

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn given_plain_line_when_parsed_then_direct_command() {
    let command = parse_line("  devices -l  ").expect("parsed");

    assert_eq!(
        command,
        ConsoleCommand::Run {
            input: "devices -l".to_string(),
            mode: CommandMode::Direct,
        }
    );
}

#[test]
fn given_dollar_prefix_when_parsed_then_shell_command() {
    let command = parse_line("$ getprop ro.product.model").expect("parsed");

    assert_eq!(
        command,
        ConsoleCommand::Run {
            input: "getprop ro.product.model".to_string(),
            mode: CommandMode::Shell,
        }
    );
}

#[test]
fn given_session_directives_when_parsed_then_mapped() {
    assert_eq!(parse_line(":start").expect("parsed"), ConsoleCommand::Start);
    assert_eq!(parse_line(":stop").expect("parsed"), ConsoleCommand::Stop);
    assert_eq!(parse_line(":disconnect").expect("parsed"), ConsoleCommand::Disconnect);
    assert_eq!(parse_line(":clear").expect("parsed"), ConsoleCommand::Clear);
    assert_eq!(parse_line(":status").expect("parsed"), ConsoleCommand::Status);
    assert_eq!(parse_line(":quit").expect("parsed"), ConsoleCommand::Quit);
    assert_eq!(parse_line("").expect("parsed"), ConsoleCommand::Empty);
    assert_eq!(
        parse_line(":pair 127.0.0.1:37000 123456").expect("parsed"),
        ConsoleCommand::Pair {
            address: "127.0.0.1:37000".to_string(),
            code: "123456".to_string(),
        }
    );
    assert_eq!(
        parse_line(":code 123456").expect("parsed"),
        ConsoleCommand::Code("123456".to_string())
    );
}

/// **VALUE**: Malformed directives are reported to the user instead of being
/// sent to adb.
///
/// **WHY THIS MATTERS**: `:pair` with a missing code would otherwise fall
/// through as a direct command and produce a confusing adb error.
///
/// **BUG THIS CATCHES**: Would catch argument-count checks being dropped.
#[test]
fn given_bad_directives_when_parsed_then_console_errors() {
    for line in [":pair 127.0.0.1:37000", ":connect", ":start now", ":frobnicate"] {
        assert!(
            matches!(parse_line(line), Err(AdbHostError::Console { .. })),
            "line: {line}"
        );
    }
}

#[test]
fn given_rolling_log_buffer_when_diffed_then_only_new_lines_oldest_first() {
    let previous = lines(&["c", "b", "a"]);
    let next = lines(&["e", "d", "c", "b"]);

    let fresh = fresh_log_lines(&previous, &next);

    assert_eq!(fresh, vec!["d", "e"]);
}

#[test]
fn given_repeated_log_line_when_diffed_then_repeat_is_new() {
    let previous = lines(&["Server already stopped."]);
    let next = lines(&["Server already stopped.", "Server already stopped."]);

    assert_eq!(fresh_log_lines(&previous, &next).len(), 1);
    assert!(fresh_log_lines(&next, &next).is_empty());
    assert_eq!(fresh_log_lines(&[], &next).len(), 2);
}

#[test]
fn given_full_output_buffer_when_diffed_then_only_appended_lines() {
    let previous = lines(&["l0", "l1", "l2"]);
    let next = lines(&["l1", "l2", "l3"]);

    assert_eq!(fresh_output_lines(&previous, &next), lines(&["l3"]).as_slice());
    assert_eq!(fresh_output_lines(&[], &next), next.as_slice());
}

#[test]
fn given_session_with_error_when_status_reported_then_all_parts_shown() {
    let state = SessionState {
        server_running: true,
        connection_state: ConnectionState::Connected,
        connect_address: "127.0.0.1:5555".to_string(),
        last_command: Some("adb devices".to_string()),
        last_command_exit_code: Some(0),
        last_error: Some("Start the server first.".to_string()),
        ..SessionState::default()
    };

    let report = status_report(&state);

    assert!(report.starts_with("ADB Host: Server running · Connected"));
    assert!(report.contains("connect: 127.0.0.1:5555"));
    assert!(report.contains("last command: adb devices (exit 0)"));
    assert!(report.contains("error: Start the server first."));
    assert!(!report.contains("pairing:"));
}
