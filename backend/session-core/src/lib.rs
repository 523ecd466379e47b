//! Control plane for a single local wireless-debug session.
//!
//! The crate pairs with, connects to and runs commands against exactly one
//! on-device debug endpoint through an external debug-host backend, while
//! keeping every target on the local machine and every backend call
//! serialized behind a single worker.

pub mod backend;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod ipc;
pub mod notification;
pub mod security;
pub mod session;

#[cfg(test)]
mod tests;

pub use session::{CommandMode, ConnectionState, SessionController, SessionOptions, SessionState};

pub const ADB_BINARY: &str = "adb";
pub const LOCAL_HOSTNAME: &str = "127.0.0.1";
pub const DEFAULT_ADB_SERVER_PORT: u16 = 5037;
pub const DEFAULT_SOCKET_SPEC: &str = const_format::concatcp!("tcp:", DEFAULT_ADB_SERVER_PORT);
