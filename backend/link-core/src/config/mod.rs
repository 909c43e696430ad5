//! Connection configuration: load, validate, default.
//!
//! The file is loaded exactly once at startup and immutable afterwards; a
//! changed file requires a restart. A missing file is written with defaults
//! and reported as a fatal condition, because the default password is blank
//! and a handshake with it can only fail.

use crate::DEFAULT_PANEL_ADDR;
use crate::error::config::ConfigError;

use common::{ErrorLocation, RedactedSecret};

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Reconnect intervals at or below this are considered misconfigured
/// (they would hammer the panel).
const MIN_RECONNECT_INTERVAL_MS: f64 = 500.0;

/// Which protocol generation's handshake to run.
///
/// Deployments pin to one panel version, so this is explicit configuration
/// rather than something guessed from payload shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeMode {
    /// Client-initiated verify on open; digest keyed on an RFC3339
    /// timestamp included in the payload.
    #[default]
    Timestamp,
    /// Server-initiated `verify_request` carrying a nonce; the client
    /// answers with a digest keyed on that nonce.
    Challenge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketConfig {
    pub addr: String,
    pub password: RedactedSecret,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_PANEL_ADDR.to_string(),
            password: RedactedSecret::new(""),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    pub enable: bool,
    /// Milliseconds between retries.
    pub interval: f64,
    #[serde(rename = "maxTimes")]
    pub max_times: i64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enable: true,
            interval: 7500.0,
            max_times: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Label shown to the panel during the handshake; empty means "let the
    /// panel label us by address".
    #[serde(rename = "customName", default)]
    pub custom_name: Option<String>,

    pub websocket: WebsocketConfig,

    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub handshake: HandshakeMode,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            custom_name: Some(String::new()),
            websocket: WebsocketConfig::default(),
            reconnect: ReconnectConfig::default(),
            handshake: HandshakeMode::default(),
        }
    }
}

impl LinkConfig {
    /// Load `{data_dir}/config.json`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Created`] on first run: defaults were written and
    ///   the operator must fill in the password before restarting.
    /// - [`ConfigError::Read`] / [`ConfigError::Parse`] for unreadable or
    ///   malformed files.
    /// - [`ConfigError::Validation`] naming the offending field.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            Self::default().write(data_dir)?;
            return Err(ConfigError::Created {
                location: ErrorLocation::from(Location::caller()),
                path: config_path,
            });
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            })?;

        let config: LinkConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        if config.custom_name().is_none() {
            warn!("`customName` is empty; the panel will label this instance by address");
        }

        info!("Configuration loaded from {}", config_path.display());
        Ok(config)
    }

    /// Write this config to `{data_dir}/config.json` using a temp file +
    /// rename so a crash can never leave a half-written file behind.
    pub fn write(&self, data_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let temp_path = data_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
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

        info!("Configuration written to {}", config_path.display());
        Ok(())
    }

    /// Field-by-field validation. Every violation names its field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.websocket.addr.is_empty() {
            return Err(Self::invalid("websocket.addr", "must not be empty"));
        }

        match Url::parse(&self.websocket.addr) {
            Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
            Ok(url) => {
                return Err(Self::invalid(
                    "websocket.addr",
                    format!("scheme `{}` is not ws:// or wss://", url.scheme()),
                ));
            }
            Err(e) => {
                return Err(Self::invalid(
                    "websocket.addr",
                    format!("not a valid URL: {e}"),
                ));
            }
        }

        if self.websocket.password.is_empty() {
            return Err(Self::invalid("websocket.password", "must not be empty"));
        }

        if !self.reconnect.interval.is_finite()
            || self.reconnect.interval <= MIN_RECONNECT_INTERVAL_MS
        {
            return Err(Self::invalid(
                "reconnect.interval",
                format!("must be greater than {MIN_RECONNECT_INTERVAL_MS} milliseconds"),
            ));
        }

        if self.reconnect.max_times < 0 {
            return Err(Self::invalid("reconnect.maxTimes", "must not be negative"));
        }

        Ok(())
    }

    /// The custom name with "unset" and "empty" collapsed.
    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect.interval as u64)
    }

    #[track_caller]
    fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::Validation {
            location: ErrorLocation::from(Location::caller()),
            field,
            reason: reason.into(),
        }
    }
}
