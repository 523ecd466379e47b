//! The seam between the session worker and the debug-host backend.
//!
//! The worker calls a [`DebugBackend`] from a blocking context, one call at a
//! time. Failures come back as [`BackendError`]; `BackendError::Rejected` is
//! what a native `ERROR:<msg>` result maps to.

pub mod process;

pub use process::ProcessBackend;

use crate::DEFAULT_SOCKET_SPEC;
use crate::error::BackendError;

use common::RedactedPairingCode;

use std::path::PathBuf;

use tokio::sync::mpsc;

/// Directories and server socket handed to the backend on initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPaths {
    pub base_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub socket_spec: String,
}

impl BackendPaths {
    pub fn new(base_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache_dir: cache_dir.into(),
            socket_spec: DEFAULT_SOCKET_SPEC.to_string(),
        }
    }

    pub fn with_socket_spec(mut self, socket_spec: impl Into<String>) -> Self {
        self.socket_spec = socket_spec.into();
        self
    }
}

/// Where a running command sends its output lines.
///
/// The receiving end belongs to the session worker, which is the only writer
/// of the command output buffer.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<String>,
}

impl OutputSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Forward one output line. Lines emitted after the worker stopped
    /// listening are dropped.
    pub fn emit(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

/// Debug-host backend operations.
///
/// Every method may block; the worker runs them on the blocking pool and never
/// issues two calls at once.
pub trait DebugBackend: Send + Sync + 'static {
    /// Prepare the backend. Must be idempotent: once it has succeeded, later
    /// calls return `Ok(())` immediately.
    fn initialize(&self, paths: &BackendPaths) -> Result<(), BackendError>;

    fn start_server(&self) -> Result<String, BackendError>;

    fn stop_server(&self) -> Result<String, BackendError>;

    fn pair(&self, address: &str, code: &RedactedPairingCode) -> Result<String, BackendError>;

    fn connect(&self, address: &str) -> Result<String, BackendError>;

    fn disconnect(&self, address: Option<&str>) -> Result<String, BackendError>;

    /// Run a command line (program name excluded), streaming output lines into
    /// `output`. Returns the exit code; `-1` when the command could not run.
    fn run_command_streaming(&self, args: &[String], output: &OutputSink) -> i32;
}
