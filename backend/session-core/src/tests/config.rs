use crate::config::{CONFIG_FILE_NAME, DEFAULT_IPC_PORT, HostConfig};
use crate::error::config::ConfigError;

use std::path::PathBuf;

use tempfile::TempDir;

#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = HostConfig::load(dir.path()).expect("defaults");

    assert_eq!(config, HostConfig::default());
    assert_eq!(config.backend.adb_path, "adb");
    assert_eq!(config.backend.socket_spec, "tcp:5037");
    assert_eq!(config.ipc.port, DEFAULT_IPC_PORT);
    assert!(config.ipc.enabled);
    assert!(!config.session.auto_start_server);
}

/// **VALUE**: Verifies save + load preserves every field and leaves no temp file.
///
/// **WHY THIS MATTERS**: The temp-file-and-rename write is what keeps a crash
/// from truncating the user's config.
///
/// **BUG THIS CATCHES**: Renaming in the wrong direction or forgetting the rename.
#[test]
fn given_custom_config_when_saved_then_loads_back_and_temp_file_is_gone() {
    // GIVEN: A non-default config
    let dir = TempDir::new().expect("temp dir");
    let mut config = HostConfig::default();
    config.backend.adb_path = "/opt/platform-tools/adb".to_string();
    config.backend.base_dir = Some(PathBuf::from("/var/lib/adbhost"));
    config.backend.socket_spec = "localabstract:adbhost".to_string();
    config.ipc.port = 20000;
    config.session.auto_start_server = true;

    // WHEN: Saving and loading
    config.save(dir.path()).expect("saved");
    let loaded = HostConfig::load(dir.path()).expect("loaded");

    // THEN: Same config, no leftover temp file
    assert_eq!(loaded, config);
    assert!(!dir.path().join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
}

#[test]
fn given_partial_json_when_loaded_then_missing_fields_take_defaults() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{ "ipc": { "port": 20001 } }"#,
    )
    .expect("written");

    let config = HostConfig::load(dir.path()).expect("loaded");

    assert_eq!(config.ipc.port, 20001);
    assert!(config.ipc.enabled);
    assert_eq!(config.backend.adb_path, "adb");
}

#[test]
fn given_corrupt_json_when_loaded_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("written");

    let result = HostConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn given_invalid_values_when_validated_then_validation_error() {
    let mut bad_version = HostConfig::default();
    bad_version.version = 2;

    let mut blank_adb = HostConfig::default();
    blank_adb.backend.adb_path = "  ".to_string();

    let mut bad_socket = HostConfig::default();
    bad_socket.backend.socket_spec = "udp:5037".to_string();

    let mut empty_socket = HostConfig::default();
    empty_socket.backend.socket_spec = "tcp:".to_string();

    let mut zero_port = HostConfig::default();
    zero_port.ipc.port = 0;

    for config in [bad_version, blank_adb, bad_socket, empty_socket, zero_port] {
        assert!(
            matches!(config.validate(), Err(ConfigError::Validation { .. })),
            "config: {config:?}"
        );
    }
}

#[test]
fn given_invalid_config_when_saved_then_nothing_is_written() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = HostConfig::default();
    config.ipc.port = 0;

    assert!(config.save(dir.path()).is_err());
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn given_no_file_when_load_or_init_then_defaults_are_written() {
    let dir = TempDir::new().expect("temp dir");

    let config = HostConfig::load_or_init(dir.path()).expect("initialized");

    assert_eq!(config, HostConfig::default());
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn given_explicit_dirs_when_resolving_paths_then_they_are_used() {
    let mut config = HostConfig::default();
    config.backend.base_dir = Some(PathBuf::from("/data/base"));
    config.backend.cache_dir = Some(PathBuf::from("/data/cache"));

    let paths = config.backend.paths();

    assert_eq!(paths.base_dir, PathBuf::from("/data/base"));
    assert_eq!(paths.cache_dir, PathBuf::from("/data/cache"));
    assert_eq!(paths.socket_spec, "tcp:5037");
}

#[test]
fn given_default_dirs_when_resolving_paths_then_they_live_under_app_dir() {
    let paths = HostConfig::default().backend.paths();

    assert!(paths.base_dir.ends_with("adbhost/backend"));
    assert!(paths.cache_dir.ends_with("adbhost"));
}
