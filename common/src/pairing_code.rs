//! Pairing code handling with redacted Debug output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// Number of digits in a wireless-debugging pairing code.
pub const PAIRING_CODE_LEN: usize = 6;

/// A pairing code that never exposes its digits in logs or debug output.
///
/// The backing buffer is wiped when the value is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RedactedPairingCode {
    inner: String,
}

impl RedactedPairingCode {
    /// Wrap a pairing code as typed by the user.
    pub fn new(code: impl Into<String>) -> Self {
        Self { inner: code.into() }
    }

    /// Parse a reply-style input: exactly six ASCII digits after trimming.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim();
        if normalized.len() == PAIRING_CODE_LEN && normalized.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self::new(normalized))
        } else {
            None
        }
    }

    /// Get the digits for handing to the backend.
    ///
    /// # Security Note
    /// Only call this at the backend boundary.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedPairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedPairingCode([REDACTED])")
    }
}

impl fmt::Display for RedactedPairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED PAIRING CODE]")
    }
}

impl Drop for RedactedPairingCode {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Keep the code out of any serialized snapshot or wire frame.
impl serde::Serialize for RedactedPairingCode {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::Serialization {
            message: String::from(
                "RedactedPairingCode cannot be serialized - use expose() explicitly",
            ),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
