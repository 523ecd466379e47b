//! WebSocket observer/control channel for out-of-process front-ends.
//!
//! - Localhost-only binding (`127.0.0.1`), non-loopback peers rejected
//! - JSON text frames (see [`protocol`])
//! - The first frame must be an `auth` message carrying the server token
//! - After authentication every published session snapshot is pushed to the
//!   client

mod client_auth;
mod handle;
pub mod protocol;
mod server;

pub use handle::IpcServerHandle;
pub use server::start_ipc_server;
