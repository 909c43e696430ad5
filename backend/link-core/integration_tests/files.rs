// Public-API tests for the file-backed stores: first-run config flow and
// identity persistence.

use link_core::config::{CONFIG_FILE_NAME, LinkConfig};
use link_core::error::config::ConfigError;
use link_core::identity::InstanceId;

use serde_json::{Value, json};

/// The operator's first-run experience end-to-end: load fails with an
/// instructive error, the written defaults parse, and filling in the
/// password is the only edit needed to come up.
#[test]
fn first_run_writes_defaults_then_password_edit_unblocks_startup() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = LinkConfig::load(dir.path());
    assert!(matches!(first, Err(ConfigError::Created { .. })));

    let config_path = dir.path().join(CONFIG_FILE_NAME);
    let mut written: Value =
        serde_json::from_str(&std::fs::read_to_string(&config_path).expect("read"))
            .expect("defaults parse");

    written["websocket"]["password"] = json!("hunter2");
    std::fs::write(
        &config_path,
        serde_json::to_string_pretty(&written).expect("serialize"),
    )
    .expect("write");

    let config = LinkConfig::load(dir.path()).expect("fixed config loads");
    assert_eq!(config.websocket.password.expose(), "hunter2");
    assert!(config.reconnect.enable);
}

#[test]
fn identity_survives_simulated_restarts() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = InstanceId::load(dir.path()).expect("first boot");
    let second = InstanceId::load(dir.path()).expect("second boot");

    assert_eq!(first.token(), second.token());
    assert_eq!(first.token().len(), 32);
}
