use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures reported by (or while talking to) the debug-host backend.
///
/// `Rejected` is the typed form of the native layer's `ERROR:<msg>` result.
#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("Backend Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend Rejected Error: {message} {location}")]
    Rejected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Backend IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend Worker Error: {message} {location}")]
    Worker {
        message: String,
        location: ErrorLocation,
    },
}

impl BackendError {
    /// Backend-reported failure, the equivalent of an `ERROR:` result.
    #[track_caller]
    pub fn rejected(message: impl Into<String>) -> Self {
        BackendError::Rejected {
            message: message.into().trim().to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Text suitable for `lastError` (no location suffix).
    pub fn user_message(&self) -> &str {
        match self {
            BackendError::Unavailable { message, .. }
            | BackendError::Rejected { message, .. }
            | BackendError::Spawn { message, .. }
            | BackendError::Io { message, .. }
            | BackendError::Worker { message, .. } => message,
        }
    }
}

impl From<IoError> for BackendError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        BackendError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
