pub mod backend;
pub mod config;
pub mod discovery;
pub mod ipc;
pub mod session;

pub use backend::BackendError;
pub use session::SessionError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Session(#[from] session::SessionError),

    #[error(transparent)]
    Backend(#[from] backend::BackendError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Discovery(#[from] discovery::DiscoveryError),

    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),
}
