// Unit tests for configuration load-or-create and validation.

use crate::DEFAULT_PANEL_ADDR;
use crate::config::{CONFIG_FILE_NAME, HandshakeMode, LinkConfig};
use crate::error::config::ConfigError;

use serde_json::{Value, json};

fn write_config(dir: &std::path::Path, value: &Value) {
    std::fs::write(
        dir.join(CONFIG_FILE_NAME),
        serde_json::to_string_pretty(value).expect("serialize"),
    )
    .expect("write config");
}

fn valid_config() -> Value {
    json!({
        "customName": "my server",
        "websocket": {
            "addr": "wss://panel.example/ws/instance",
            "password": "hunter2"
        },
        "reconnect": {
            "enable": true,
            "interval": 5000,
            "maxTimes": 3
        }
    })
}

/// **VALUE**: First run must never proceed silently: the default password
/// is blank, so a handshake with it can only fail. The operator gets a
/// default file to edit and an explicit error.
#[test]
fn given_no_file_when_loaded_then_defaults_written_and_created_error() {
    let dir = tempfile::tempdir().expect("tempdir");

    let result = LinkConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Created { .. })));

    let written: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).expect("read defaults"),
    )
    .expect("defaults are JSON");

    assert_eq!(written["websocket"]["addr"], DEFAULT_PANEL_ADDR);
    assert_eq!(written["websocket"]["password"], "");
    assert_eq!(written["reconnect"]["enable"], true);
    assert_eq!(written["reconnect"]["interval"], 7500.0);
    assert_eq!(written["reconnect"]["maxTimes"], 10);
}

#[test]
fn given_fresh_default_file_when_loaded_again_then_blank_password_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let _ = LinkConfig::load(dir.path());

    let result = LinkConfig::load(dir.path());

    assert!(matches!(
        result,
        Err(ConfigError::Validation {
            field: "websocket.password",
            ..
        })
    ));
}

#[test]
fn given_valid_file_when_loaded_then_all_fields_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["handshake"] = json!("challenge");
    write_config(dir.path(), &value);

    let config = LinkConfig::load(dir.path()).expect("valid config");

    assert_eq!(config.custom_name(), Some("my server"));
    assert_eq!(config.websocket.addr, "wss://panel.example/ws/instance");
    assert_eq!(config.websocket.password.expose(), "hunter2");
    assert!(config.reconnect.enable);
    assert_eq!(config.reconnect.max_times, 3);
    assert_eq!(config.retry_interval().as_millis(), 5000);
    assert_eq!(config.handshake, HandshakeMode::Challenge);
}

#[test]
fn given_no_handshake_key_when_loaded_then_timestamp_mode_is_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_config(dir.path(), &valid_config());

    let config = LinkConfig::load(dir.path()).expect("valid config");

    assert_eq!(config.handshake, HandshakeMode::Timestamp);
}

#[test]
fn given_interval_at_lower_bound_when_loaded_then_error_names_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["reconnect"]["interval"] = json!(500);
    write_config(dir.path(), &value);

    let result = LinkConfig::load(dir.path());

    assert!(matches!(
        result,
        Err(ConfigError::Validation {
            field: "reconnect.interval",
            ..
        })
    ));
}

#[test]
fn given_negative_max_times_when_loaded_then_error_names_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["reconnect"]["maxTimes"] = json!(-1);
    write_config(dir.path(), &value);

    let result = LinkConfig::load(dir.path());

    assert!(matches!(
        result,
        Err(ConfigError::Validation {
            field: "reconnect.maxTimes",
            ..
        })
    ));
}

#[test]
fn given_non_websocket_scheme_when_loaded_then_error_names_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["websocket"]["addr"] = json!("http://panel.example/ws");
    write_config(dir.path(), &value);

    let result = LinkConfig::load(dir.path());

    assert!(matches!(
        result,
        Err(ConfigError::Validation {
            field: "websocket.addr",
            ..
        })
    ));
}

#[test]
fn given_unparseable_addr_when_loaded_then_error_names_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["websocket"]["addr"] = json!("not a url");
    write_config(dir.path(), &value);

    let result = LinkConfig::load(dir.path());

    assert!(matches!(
        result,
        Err(ConfigError::Validation {
            field: "websocket.addr",
            ..
        })
    ));
}

#[test]
fn given_malformed_json_when_loaded_then_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("write");

    let result = LinkConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn given_empty_custom_name_when_queried_then_treated_as_unset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut value = valid_config();
    value["customName"] = json!("");
    write_config(dir.path(), &value);

    let config = LinkConfig::load(dir.path()).expect("valid config");

    assert_eq!(config.custom_name(), None);
}
