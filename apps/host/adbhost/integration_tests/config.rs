use session_core::config::{CONFIG_DIR_ENV, CONFIG_FILE_NAME, HostConfig, config_dir};

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: The config directory can be redirected from the environment (and
/// so from `.env`).
///
/// **WHY THIS MATTERS**: Portable installs and tests must not touch the user's
/// real config directory.
///
/// **BUG THIS CATCHES**: Would catch the override being ignored, or first start
/// not writing a default file where the binary will look next time.
#[test]
#[serial]
fn given_config_dir_override_when_first_started_then_defaults_written_there() {
    // GIVEN: An empty override directory
    let dir = TempDir::new().expect("temp dir");
    // SAFETY: serialized with the other environment tests.
    unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };

    // WHEN: Resolving and loading
    let resolved = config_dir().expect("config dir");
    let config = HostConfig::load_or_init(&resolved).expect("loaded");

    // THEN: Defaults, persisted in the override directory
    assert_eq!(resolved, dir.path());
    assert_eq!(config, HostConfig::default());
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());

    unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
}

#[test]
#[serial]
fn given_edited_config_when_loaded_again_then_edits_survive() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = HostConfig::load_or_init(dir.path()).expect("loaded");
    config.session.auto_start_server = true;
    config.ipc.enabled = false;
    config.save(dir.path()).expect("saved");

    let reloaded = HostConfig::load_or_init(dir.path()).expect("reloaded");

    assert!(reloaded.session.auto_start_server);
    assert!(!reloaded.ipc.enabled);
}
