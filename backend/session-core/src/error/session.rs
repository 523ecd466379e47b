use crate::error::backend::BackendError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors surfaced by the session controller.
///
/// Validation and security rejections are raised synchronously, before
/// anything reaches the worker queue.
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Backend Unavailable Error: {message} {location}")]
    BackendUnavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Security Rejection Error: {message} {location}")]
    SecurityRejection {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend Error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },

    #[error("Non-Zero Exit Error: {message} {location}")]
    NonZeroExit {
        exit_code: i32,
        message: String,
        location: ErrorLocation,
    },

    #[error("Actor Error: {message} {location}")]
    Actor {
        message: String,
        location: ErrorLocation,
    },
}

impl SessionError {
    #[track_caller]
    pub fn non_zero_exit(exit_code: i32) -> Self {
        SessionError::NonZeroExit {
            exit_code,
            message: format!("Command failed with exit code {exit_code}."),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Text stored in `last_error` (no location suffix).
    pub fn user_message(&self) -> &str {
        match self {
            SessionError::BackendUnavailable { message, .. }
            | SessionError::Validation { message, .. }
            | SessionError::SecurityRejection { message, .. }
            | SessionError::Backend { message, .. }
            | SessionError::NonZeroExit { message, .. }
            | SessionError::Actor { message, .. } => message,
        }
    }
}

impl From<BackendError> for SessionError {
    #[track_caller]
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Unavailable { message, .. } => SessionError::BackendUnavailable {
                message,
                location: ErrorLocation::from(Location::caller()),
            },
            other => SessionError::Backend {
                message: other.user_message().to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
