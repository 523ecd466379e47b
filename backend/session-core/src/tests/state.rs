use crate::session::{ConnectionState, SessionEvent, SessionState};

use common::RedactedPairingCode;

use ConnectionState::{Connected, Error, Idle, Paired, Pairing};

#[test]
fn given_new_session_when_created_then_defaults_are_idle_and_empty() {
    let state = SessionState::default();

    assert_eq!(state.connection_state, Idle);
    assert!(!state.server_running);
    assert!(state.logs.is_empty());
    assert!(state.last_error.is_none());
}

/// **VALUE**: Walks the full pairing path through the transition table.
///
/// **WHY THIS MATTERS**: Observers key their display off these states; a missing
/// transition leaves the UI stuck in Pairing.
///
/// **BUG THIS CATCHES**: Success events mapped to the wrong target state.
#[test]
fn given_pairing_flow_when_events_applied_then_states_advance() {
    let state = Idle
        .apply(SessionEvent::ServerStarted { was_running: false })
        .apply(SessionEvent::PairingStarted);
    assert_eq!(state, Pairing);

    let state = state.apply(SessionEvent::PairingSucceeded);
    assert_eq!(state, Paired);

    let state = state.apply(SessionEvent::ConnectSucceeded);
    assert_eq!(state, Connected);

    assert_eq!(state.apply(SessionEvent::DisconnectSucceeded), Idle);
}

#[test]
fn given_running_server_when_started_again_then_state_is_kept() {
    assert_eq!(
        Connected.apply(SessionEvent::ServerStarted { was_running: true }),
        Connected
    );
    assert_eq!(
        Paired.apply(SessionEvent::ServerStarted { was_running: true }),
        Paired
    );
}

#[test]
fn given_error_state_when_server_started_then_error_is_cleared() {
    assert_eq!(Error.apply(SessionEvent::ServerStarted { was_running: true }), Idle);
    assert_eq!(Error.apply(SessionEvent::ServerStarted { was_running: false }), Idle);
}

#[test]
fn given_any_state_when_failure_applied_then_error() {
    for state in [Idle, Pairing, Paired, Connected, Error] {
        assert_eq!(state.apply(SessionEvent::Failed), Error);
    }
}

#[test]
fn given_any_state_when_server_stopped_then_idle() {
    for state in [Idle, Pairing, Paired, Connected, Error] {
        assert_eq!(state.apply(SessionEvent::ServerStopped), Idle);
    }
}

#[test]
fn given_snapshot_when_transitioned_then_other_fields_are_copied() {
    let state = SessionState {
        connect_address: "127.0.0.1:5555".to_string(),
        logs: vec!["hello".to_string()],
        ..SessionState::default()
    };

    let next = state.transition(SessionEvent::ConnectSucceeded);

    assert_eq!(next.connection_state, Connected);
    assert_eq!(next.connect_address, "127.0.0.1:5555");
    assert_eq!(next.logs, state.logs);
    assert_eq!(state.connection_state, Idle);
}

/// **VALUE**: Keeps the pairing code out of every serialized snapshot.
///
/// **WHY THIS MATTERS**: Snapshots are pushed to IPC clients and may be logged.
///
/// **BUG THIS CATCHES**: Dropping the serde skip on the code field.
#[test]
fn given_pairing_code_in_state_when_serialized_then_code_is_absent() {
    let state = SessionState {
        pairing_code: RedactedPairingCode::new("123456"),
        ..SessionState::default()
    };

    let json = serde_json::to_string(&state).expect("serializable");

    assert!(!json.contains("123456"));
    assert!(!json.contains("pairing_code"));
}

/// **VALUE**: Debug output of a snapshot never shows the pairing code.
///
/// **WHY THIS MATTERS**: Snapshots are cloned to every subscriber and end up
/// in `{:?}` log lines.
///
/// **BUG THIS CATCHES**: Holding the code as a plain string in the snapshot.
#[test]
fn given_pairing_code_in_state_when_debug_formatted_then_code_is_redacted() {
    let state = SessionState {
        pairing_code: RedactedPairingCode::new("123456"),
        ..SessionState::default()
    };

    let debug = format!("{state:?}");

    assert!(!debug.contains("123456"));
    assert!(debug.contains("[REDACTED]"));
    assert_eq!(state.pairing_code.expose(), "123456");
}

#[test]
fn given_states_when_displayed_then_labels_match() {
    let labels: Vec<String> = [Idle, Pairing, Paired, Connected, Error]
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(labels, ["Idle", "Pairing", "Paired", "Connected", "Error"]);
}
