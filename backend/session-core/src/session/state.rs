use common::RedactedPairingCode;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// Pairing/connection state. Exactly one value at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Pairing,
    Paired,
    Connected,
    Error,
}

impl Display for ConnectionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let label = match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Pairing => "Pairing",
            ConnectionState::Paired => "Paired",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error => "Error",
        };
        formatter.write_str(label)
    }
}

/// Outcomes that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// `was_running` is whether the server was already marked running.
    ServerStarted { was_running: bool },
    ServerStopped,
    PairingStarted,
    PairingSucceeded,
    ConnectSucceeded,
    DisconnectSucceeded,
    /// Any backend failure, or an unavailable backend.
    Failed,
}

impl ConnectionState {
    pub fn apply(self, event: SessionEvent) -> ConnectionState {
        match event {
            SessionEvent::ServerStarted { was_running: true } if self != ConnectionState::Error => {
                self
            }
            SessionEvent::ServerStarted { .. } => ConnectionState::Idle,
            SessionEvent::ServerStopped => ConnectionState::Idle,
            SessionEvent::PairingStarted => ConnectionState::Pairing,
            SessionEvent::PairingSucceeded => ConnectionState::Paired,
            SessionEvent::ConnectSucceeded => ConnectionState::Connected,
            SessionEvent::DisconnectSucceeded => ConnectionState::Idle,
            SessionEvent::Failed => ConnectionState::Error,
        }
    }
}

/// Immutable snapshot of the session.
///
/// Buffers are most-recent-first except `last_command_output`, which keeps
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub server_running: bool,
    pub connection_state: ConnectionState,
    pub pairing_address: String,
    /// Never leaves the process.
    #[serde(skip)]
    pub pairing_code: RedactedPairingCode,
    pub connect_address: String,
    pub command_input: String,
    pub command_history: Vec<String>,
    pub last_command: Option<String>,
    pub last_command_exit_code: Option<i32>,
    pub last_command_output: Vec<String>,
    pub command_running: bool,
    pub logs: Vec<String>,
    pub last_error: Option<String>,
}

impl SessionState {
    /// Copy with the connection state advanced by `event`.
    pub fn transition(&self, event: SessionEvent) -> SessionState {
        SessionState {
            connection_state: self.connection_state.apply(event),
            ..self.clone()
        }
    }
}
