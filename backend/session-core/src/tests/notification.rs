use crate::notification::{PAIRING_PROMPT, STATUS_TITLE, StatusSummary};
use crate::session::{ConnectionState, SessionState};

#[test]
fn given_running_server_when_summarized_then_text_names_server_and_state() {
    let state = SessionState {
        server_running: true,
        connection_state: ConnectionState::Paired,
        ..SessionState::default()
    };

    let summary = StatusSummary::from_state(&state);

    assert_eq!(summary.title, STATUS_TITLE);
    assert_eq!(summary.text, "Server running · Paired");
    assert_eq!(summary.sub_text, PAIRING_PROMPT);
    assert_eq!(summary.last_error, None);
}

#[test]
fn given_stopped_server_with_error_when_summarized_then_error_is_carried() {
    let state = SessionState {
        connection_state: ConnectionState::Error,
        last_error: Some("Server start failed.".to_string()),
        ..SessionState::default()
    };

    let summary = StatusSummary::from_state(&state);

    assert_eq!(summary.text, "Server stopped · Error");
    assert_eq!(summary.last_error.as_deref(), Some("Server start failed."));
}
