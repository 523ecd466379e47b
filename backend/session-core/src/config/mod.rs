//! Host configuration stored as `config.json`.

use crate::backend::BackendPaths;
use crate::error::config::ConfigError;
use crate::{ADB_BINARY, DEFAULT_SOCKET_SPEC};

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_DIR_ENV: &str = "ADBHOST_CONFIG_DIR";
pub const APP_DIR_NAME: &str = "adbhost";
pub const DEFAULT_IPC_PORT: u16 = 19877;

const SOCKET_SCHEMES: [&str; 3] = ["tcp:", "localabstract:", "localfilesystem:"];
const BACKEND_DIR_NAME: &str = "backend";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_socket_spec")]
    pub socket_spec: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            base_dir: None,
            cache_dir: None,
            socket_spec: default_socket_spec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpcConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ipc_port")]
    pub port: u16,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_IPC_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default)]
    pub auto_start_server: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub ipc: IpcConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendConfig::default(),
            ipc: IpcConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_adb_path() -> String {
    ADB_BINARY.to_string()
}
fn default_socket_spec() -> String {
    DEFAULT_SOCKET_SPEC.to_string()
}
fn default_true() -> bool {
    true
}
fn default_ipc_port() -> u16 {
    DEFAULT_IPC_PORT
}

// ============================================
// IMPLEMENTATION
// ============================================

/// Directory holding `config.json`.
///
/// `ADBHOST_CONFIG_DIR` wins over the platform config directory.
pub fn config_dir() -> Option<PathBuf> {
    match env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)),
    }
}

impl BackendConfig {
    /// Resolve the directories handed to the backend.
    ///
    /// Unset directories default to `<data_local>/adbhost/backend` and
    /// `<cache>/adbhost`, falling back to the system temp dir.
    pub fn paths(&self) -> BackendPaths {
        let base_dir = self.base_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(env::temp_dir)
                .join(APP_DIR_NAME)
                .join(BACKEND_DIR_NAME)
        });
        let cache_dir = self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join(APP_DIR_NAME)
        });

        BackendPaths::new(base_dir, cache_dir).with_socket_spec(self.socket_spec.clone())
    }
}

impl HostConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: HostConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Load the config, writing the defaults first when no file exists yet.
    pub fn load_or_init(config_dir: &Path) -> Result<Self, ConfigError> {
        if config_dir.join(CONFIG_FILE_NAME).exists() {
            return Self::load(config_dir);
        }

        let config = Self::default();
        config.save(config_dir)?;
        Ok(config)
    }

    /// Save config to {config_dir}/config.json (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation,
    /// serialization, the write or the rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                    self.version
                ),
            });
        }

        if self.backend.adb_path.trim().is_empty() {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "backend.adb_path cannot be empty".to_string(),
            });
        }

        let spec = self.backend.socket_spec.as_str();
        let known_scheme = SOCKET_SCHEMES
            .iter()
            .any(|scheme| spec.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
        if !known_scheme {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid socket spec: {spec}"),
            });
        }

        if self.ipc.port == 0 {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "ipc.port must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
