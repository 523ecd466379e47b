//! JSON frames exchanged over the IPC socket.
//!
//! Every frame is an object with a `type` tag and a `request_id` used to
//! correlate responses. Pushed snapshots carry `request_id` 0.

use crate::session::{CommandMode, SessionState};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub request_id: u64,
    #[serde(flatten)]
    pub request: ClientRequest,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    Auth { token: String },
    GetState,
    StartServer,
    StopServer,
    Pair { address: String, code: String },
    Connect { address: String },
    Disconnect,
    RunCommand { input: String, mode: CommandMode },
    PairingReply { input: String },
    ClearOutput,
    ClearError,
}

impl ClientRequest {
    /// Frame type, for logging without leaking tokens or codes.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::Auth { .. } => "auth",
            ClientRequest::GetState => "get_state",
            ClientRequest::StartServer => "start_server",
            ClientRequest::StopServer => "stop_server",
            ClientRequest::Pair { .. } => "pair",
            ClientRequest::Connect { .. } => "connect",
            ClientRequest::Disconnect => "disconnect",
            ClientRequest::RunCommand { .. } => "run_command",
            ClientRequest::PairingReply { .. } => "pairing_reply",
            ClientRequest::ClearOutput => "clear_output",
            ClientRequest::ClearError => "clear_error",
        }
    }
}

impl std::fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClientRequest({})", self.kind())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AuthError,
    InvalidMessage,
    Rejected,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub request_id: u64,
    #[serde(flatten)]
    pub message: ServerMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Ack,
    Error {
        code: ErrorCode,
        message: String,
    },
    State {
        state: SessionState,
    },
}

impl ServerFrame {
    pub fn new(request_id: u64, message: ServerMessage) -> Self {
        Self {
            request_id,
            message,
        }
    }

    pub fn error(request_id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ServerMessage::Error {
                code,
                message: message.into(),
            },
        )
    }

    pub fn state(request_id: u64, state: SessionState) -> Self {
        Self::new(request_id, ServerMessage::State { state })
    }
}
