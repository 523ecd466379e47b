use std::net::SocketAddr;

use log::warn;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a running IPC server.
///
/// Dropping the handle leaves the server running; call
/// [`shutdown`](IpcServerHandle::shutdown) to stop accepting and close the open
/// connections.
pub struct IpcServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) auth_token: String,
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) task: JoinHandle<()>,
}

impl IpcServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token clients must send in their `auth` frame.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("IPC accept loop ended abnormally: {e}");
        }
    }
}
