use adbhost::console;
use adbhost::error::AdbHostError;
use adbhost::logger::{default_log_dir, initialize as LoggerInitialize};

use session_core::backend::ProcessBackend;
use session_core::config::{HostConfig, config_dir};
use session_core::ipc::start_ipc_server;
use session_core::{SessionController, SessionOptions};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::sync::Arc;

use log::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AdbHostError> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let log_dir = default_log_dir();
    create_dir_all(&log_dir).map_err(|e| AdbHostError::AdbHost {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("ADB Host starting");
    info!("Log directory: {}", log_dir.display());

    let config_dir = config_dir().ok_or_else(|| AdbHostError::AdbHost {
        message: "No config directory available on this platform".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    let config = HostConfig::load_or_init(&config_dir)?;

    let backend = Arc::new(ProcessBackend::new(config.backend.adb_path.as_str()));
    let controller =
        SessionController::start(backend, SessionOptions::new(config.backend.paths())).await;

    if config.session.auto_start_server && controller.is_backend_available() {
        info!("Auto-starting the adb server");
        if let Err(e) = controller.start_server() {
            warn!("Auto-start failed: {e}");
        }
    }

    let ipc_handle = if config.ipc.enabled {
        info!("Starting IPC server on port {}", config.ipc.port);
        let handle = start_ipc_server(config.ipc.port, None, controller.clone()).await?;
        info!("IPC auth token: {}", handle.auth_token());
        Some(handle)
    } else {
        None
    };

    let printer = tokio::spawn(console::print_updates(controller.subscribe()));

    let outcome = tokio::select! {
        result = console::run(&controller) => result,
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            signal.map_err(AdbHostError::from)
        }
    };

    if let Some(handle) = ipc_handle {
        handle.shutdown().await;
    }
    controller.shutdown().await?;
    printer.abort();

    info!("ADB Host stopped");
    outcome
}
