//! The session actor.
//!
//! One [`SessionController`] owns the session for the lifetime of the process:
//!
//! - callers submit operations through the controller handle (never blocking)
//! - a single worker task drains the queue, one backend call at a time
//! - every mutation replaces the whole [`SessionState`] and is published on a
//!   `watch` channel, so observers only ever see complete snapshots

pub(crate) mod controller;
pub(crate) mod executor;
pub mod history;
mod operation;
mod state;
mod store;

pub use crate::command::CommandMode;
pub use controller::{SessionController, SessionOptions};
pub use state::{ConnectionState, SessionEvent, SessionState};
