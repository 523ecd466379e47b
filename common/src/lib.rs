//! Shared building blocks for the adbhost workspace.
//!
//! - [`ErrorLocation`]: caller location captured into every error variant
//! - [`RedactedPairingCode`]: a pairing code that never shows up in logs
//!
//! Both `session-core` and the `adbhost` binary depend on this crate so error
//! messages and secret handling look the same everywhere.

pub mod error;
pub mod pairing_code;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use pairing_code::RedactedPairingCode;

#[cfg(test)]
mod tests;
