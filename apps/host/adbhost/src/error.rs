use session_core::error::config::ConfigError;
use session_core::error::ipc::IpcError;
use session_core::error::SessionError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error;

/// Errors that stop the host binary.
///
/// Rejected requests are not errors at this level: the session records them
/// and the console prints them.
#[derive(Debug, Error)]
pub enum AdbHostError {
    /// Error from this app (startup, logger, console input)
    #[error("AdbHost Error: {message} {location}")]
    AdbHost {
        message: String,
        location: ErrorLocation,
    },

    /// Config could not be loaded or written
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from session-core (session worker, IPC server)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A console line could not be understood
    #[error("Console Error: {message} {location}")]
    Console {
        message: String,
        location: ErrorLocation,
    },
}

impl AdbHostError {
    #[track_caller]
    pub fn console(message: impl Into<String>) -> Self {
        AdbHostError::Console {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for AdbHostError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        AdbHostError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<SessionError> for AdbHostError {
    #[track_caller]
    fn from(error: SessionError) -> Self {
        AdbHostError::Core {
            message: error.user_message().to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for AdbHostError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        AdbHostError::Core {
            message: format!("Failed to start IPC server: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for AdbHostError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        AdbHostError::AdbHost {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
