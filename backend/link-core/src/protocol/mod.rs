//! Wire protocol model.
//!
//! Every frame is one JSON object: a [`Packet`] envelope whose `data` field
//! is decoded into a typed payload struct once the `type`/`subType` pair has
//! selected a handler. Decode failures never propagate: a packet that does
//! not parse is dropped, so one malformed frame cannot take the session down.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Packet subtype tags, as they appear on the wire.
pub mod subtypes {
    pub const VERIFY: &str = "verify";
    pub const VERIFY_REQUEST: &str = "verify_request";
    pub const VERIFY_RESULT: &str = "verify_result";
    pub const DISCONNECTION: &str = "disconnection";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const SERVER_START: &str = "server_start";
    pub const SERVER_STOP: &str = "server_stop";
    pub const SERVER_KILL: &str = "server_kill";
    pub const SERVER_INPUT: &str = "server_input";
    pub const SERVER_OUTPUT: &str = "server_output";
    pub const GET_DIR_INFO: &str = "get_dir_info";
    pub const DIR_INFO: &str = "dir_info";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    Request,
    Return,
    Event,
}

/// Origin descriptor the panel attaches to relayed requests.
///
/// Only the address is interesting to us (actor attribution in logs);
/// unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(default)]
    pub address: Option<String>,
}

/// The wire envelope. One per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "type")]
    pub kind: PacketKind,

    #[serde(rename = "subType")]
    pub sub_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<PeerInfo>,
}

impl Packet {
    pub fn request(sub_type: &str, data: Option<Value>) -> Self {
        Self::new(PacketKind::Request, sub_type, data)
    }

    pub fn reply(sub_type: &str, data: Option<Value>) -> Self {
        Self::new(PacketKind::Return, sub_type, data)
    }

    pub fn event(sub_type: &str, data: Option<Value>) -> Self {
        Self::new(PacketKind::Event, sub_type, data)
    }

    fn new(kind: PacketKind, sub_type: &str, data: Option<Value>) -> Self {
        Self {
            kind,
            sub_type: sub_type.to_string(),
            data,
            request_id: None,
            sender: None,
        }
    }

    /// Attach the correlation id of the request being answered.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Decode one inbound frame. `None` means the frame is dropped.
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(packet) => Some(packet),
            Err(e) => {
                debug!("Dropping undecodable frame: {e}");
                None
            }
        }
    }

    /// Decode this packet's `data` into the handler's payload type.
    /// `None` means the payload is absent or malformed and the packet
    /// is dropped.
    pub fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        let data = self.data.clone()?;
        match serde_json::from_value(data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!("Dropping `{}` packet with malformed payload: {e}", self.sub_type);
                None
            }
        }
    }
}

/// Serialize a payload struct into a packet `data` value.
///
/// Serialization of our own payload types cannot realistically fail; a
/// failure is logged and the field omitted rather than bubbled up.
pub fn data_of<T: Serialize>(payload: &T) -> Option<Value> {
    match serde_json::to_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Failed to serialize outbound payload: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// `event/verify_result`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResult {
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `event/disconnection`: the panel names why it is about to drop us.
#[derive(Debug, Clone, Deserialize)]
pub struct Disconnection {
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Identity block sent during the handshake (both generations).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    /// Keyed digest: MD5 hex of `"<time>.<password>"` (timestamp mode) or
    /// `"<nonce><password>"` (challenge mode).
    pub md5: String,
    pub instance_id: String,
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub metadata: HostMetadata,
}

/// Who we are, as shown in the panel's instance list.
#[derive(Debug, Clone, Serialize)]
pub struct HostMetadata {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl HostMetadata {
    /// Metadata for this host process; `environment` describes the
    /// platform the instance runs on.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            environment: format!(
                "{}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
        }
    }
}

/// Machine half of the heartbeat reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub os: Option<String>,
    pub cpu_name: Option<String>,
    pub total_ram: Option<u64>,
    pub free_ram: Option<u64>,
    pub cpu_usage: Option<f64>,
}

/// Server-subprocess half of the heartbeat reply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    pub status: bool,
    pub filename: Option<String>,
    pub run_time: Option<String>,
    pub usage: Option<f64>,
    pub capacity: Option<u32>,
    pub online_players: Option<u32>,
    pub version: Option<String>,
}

/// `return/heartbeat` data.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatReply {
    pub system: SystemSnapshot,
    pub server: ServerSnapshot,
}

/// `return/dir_info` data. `dir` echoes the requested path verbatim;
/// `items` is present only when the listing succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct DirListing {
    pub exists: bool,
    pub dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<DirEntry>>,
}

impl DirListing {
    /// The uniform negative answer: missing, unreadable, and
    /// out-of-sandbox paths are indistinguishable on the wire.
    pub fn absent(dir: &str) -> Self {
        Self {
            exists: false,
            dir: dir.to_string(),
            items: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub kind: EntryKind,
    pub name: String,
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}
