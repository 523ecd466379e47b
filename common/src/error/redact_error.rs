use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when a secret (a pairing code) is about to leave the process.
#[derive(Debug, ThisError)]
pub enum RedactError {
    /// The secret was handed to a serializer.
    #[error("Redacted Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}
