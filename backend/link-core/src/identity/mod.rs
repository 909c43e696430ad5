//! Stable per-installation instance identity.
//!
//! The panel recognizes a returning client by a 128-bit identity that must
//! survive restarts. It is persisted as raw 16 bytes and shown on the wire
//! as a 32-character lowercase hex token.

use crate::error::identity::IdentityError;

use common::ErrorLocation;

use std::fmt;
use std::panic::Location;
use std::path::Path;

use log::warn;
use uuid::Uuid;

pub const IDENTITY_FILE_NAME: &str = ".instance-id";

/// Size of a valid persisted identity, in bytes.
const IDENTITY_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Load the identity from `{data_dir}/.instance-id`, or mint a new one.
    ///
    /// A file of exactly 16 bytes is reused verbatim. Anything else
    /// (missing, truncated, oversized, or a file that holds the hex text
    /// instead of raw bytes) is treated as malformed: a fresh
    /// random identity is generated, persisted over it, and the
    /// regeneration is logged loudly, since the panel will see this
    /// installation as a brand-new device.
    pub fn load(data_dir: &Path) -> Result<Self, IdentityError> {
        let path = data_dir.join(IDENTITY_FILE_NAME);

        if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| IdentityError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: path.clone(),
                source: e,
            })?;

            if bytes.len() == IDENTITY_LEN
                && let Ok(id) = Uuid::from_slice(&bytes)
            {
                return Ok(Self(id));
            }

            warn!(
                "Persisted instance identity at {} is malformed ({} bytes); regenerating",
                path.display(),
                bytes.len()
            );
        }

        let id = Uuid::new_v4();

        std::fs::create_dir_all(data_dir).map_err(|e| IdentityError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        std::fs::write(&path, id.as_bytes()).map_err(|e| IdentityError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: path.clone(),
            source: e,
        })?;

        let fresh = Self(id);
        warn!("New instance identity generated: {fresh}");
        Ok(fresh)
    }

    /// The 32-character lowercase hex token sent to the panel.
    pub fn token(&self) -> String {
        self.0.simple().to_string()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
