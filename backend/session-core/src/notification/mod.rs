//! Status summary for the presentation layer.
//!
//! The worker refreshes a [`StatusSink`] after every operation. What the sink
//! does with the summary (system notification, tray text, a log line) is up to
//! the embedding application.

use crate::session::SessionState;

use log::debug;
use serde::Serialize;

pub const STATUS_TITLE: &str = "ADB Host";
pub const PAIRING_PROMPT: &str = "Enter the 6-digit pairing code";

/// What a status display shows for one session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub title: String,
    pub text: String,
    pub sub_text: String,
    pub last_error: Option<String>,
}

impl StatusSummary {
    pub fn from_state(state: &SessionState) -> Self {
        let server = if state.server_running {
            "Server running"
        } else {
            "Server stopped"
        };

        Self {
            title: STATUS_TITLE.to_string(),
            text: format!("{server} · {}", state.connection_state),
            sub_text: PAIRING_PROMPT.to_string(),
            last_error: state.last_error.clone(),
        }
    }
}

pub trait StatusSink: Send + Sync {
    fn refresh(&self, status: &StatusSummary);
}

/// Default sink: writes the summary to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn refresh(&self, status: &StatusSummary) {
        match &status.last_error {
            Some(error) => debug!("{}: {} ({error})", status.title, status.text),
            None => debug!("{}: {}", status.title, status.text),
        }
    }
}
