//! The logical connection: lifecycle, handshake, reconnect policy.
//!
//! One `Session` owns one transport for the whole process lifetime. It is
//! plain state driven by the engine task: transport notifications and the
//! retry timer arrive one at a time, so nothing here needs a lock.

use crate::config::{HandshakeMode, LinkConfig};
use crate::identity::InstanceId;
use crate::protocol::{
    Disconnection, HostMetadata, Packet, VerifyPayload, VerifyResult, data_of, subtypes,
};
use crate::transport::Transport;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{error, info, warn};

/// Where the connection currently stands.
///
/// `Terminal` is the operator-visible dead end: reconnect disabled or
/// retries exhausted. Only an explicit `connect()` leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Connecting,
    Verifying,
    Verified,
    Disconnected,
    Terminal,
}

pub struct Session<T: Transport> {
    transport: T,
    config: Arc<LinkConfig>,
    identity: InstanceId,
    metadata: HostMetadata,
    phase: SessionPhase,
    /// Has any handshake succeeded this process lifetime?
    verified: bool,
    /// Reason from the most recent `disconnection` event, surfaced when
    /// the close actually lands.
    disconnect_reason: Option<String>,
    retry_count: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(
        transport: T,
        config: Arc<LinkConfig>,
        identity: InstanceId,
        metadata: HostMetadata,
    ) -> Self {
        Self {
            transport,
            config,
            identity,
            metadata,
            phase: SessionPhase::Idle,
            verified: false,
            disconnect_reason: None,
            retry_count: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Explicit connect: the initial call after process init, or a manual
    /// restart out of the terminal state (which resets the retry budget).
    /// Ignored while an attempt is already in flight; the retry timer is
    /// the only automatic retry source.
    pub fn connect(&mut self) {
        match self.phase {
            SessionPhase::Connecting | SessionPhase::Verifying | SessionPhase::Verified => {
                warn!("Connect requested while the connection is already up or in flight");
                return;
            }
            SessionPhase::Terminal => {
                info!("Manual reconnect requested; retry budget reset");
                self.retry_count = 0;
            }
            SessionPhase::Idle | SessionPhase::Disconnected => {}
        }

        self.phase = SessionPhase::Connecting;
        info!("Connecting to {}", self.config.websocket.addr);
        self.transport.open();
    }

    /// Transport reports the socket is up.
    pub fn on_open(&mut self) {
        self.phase = SessionPhase::Verifying;
        self.disconnect_reason = None;
        info!("Connected to {}", self.config.websocket.addr);

        // In challenge mode the panel speaks first (`verify_request`).
        if self.config.handshake == HandshakeMode::Timestamp {
            self.send_timestamp_verify();
        }
    }

    /// Transport reports the socket is down. Returns the delay after which
    /// the engine should fire the single retry timer, or `None` when the
    /// session goes terminal.
    pub fn on_close(&mut self) -> Option<Duration> {
        self.phase = SessionPhase::Disconnected;

        match self.disconnect_reason.take() {
            Some(reason) => warn!("Connection closed: {reason}"),
            None => warn!("Connection closed"),
        }

        if !self.config.reconnect.enable {
            self.phase = SessionPhase::Terminal;
            warn!("Automatic reconnect is disabled; waiting for a manual connect");
            return None;
        }

        if i64::from(self.retry_count) >= self.config.reconnect.max_times {
            self.phase = SessionPhase::Terminal;
            warn!(
                "Reconnect attempts exhausted ({}/{})",
                self.retry_count, self.config.reconnect.max_times
            );
            if !self.verified {
                warn!(
                    "The panel never verified this instance; check `websocket.addr` and `websocket.password`"
                );
            }
            return None;
        }

        Some(self.config.retry_interval())
    }

    /// The retry timer fired. The count is incremented before the attempt,
    /// so the log line and the cap both see the attempt being made.
    pub fn on_retry(&mut self) {
        self.retry_count += 1;
        self.phase = SessionPhase::Connecting;
        info!(
            "Reconnecting... {}/{}",
            self.retry_count, self.config.reconnect.max_times
        );
        self.transport.open();
    }

    /// `event/verify_result` from the panel.
    pub fn on_verify_result(&mut self, result: VerifyResult) {
        if result.success {
            self.phase = SessionPhase::Verified;
            self.verified = true;
            self.retry_count = 0;
            info!("Verified by the panel");
        } else {
            // The connection stays open but commands will not be honored;
            // an actual close is what drives reconnection.
            warn!(
                "Verification rejected: {}",
                result.reason.as_deref().unwrap_or("no reason given")
            );
        }
    }

    /// `event/disconnection`, remembered until the close lands.
    pub fn on_disconnection(&mut self, event: Disconnection) {
        self.disconnect_reason = event.reason;
    }

    /// Answer a challenge-mode `verify_request` (the digest is keyed on
    /// the panel's nonce instead of a timestamp).
    pub fn answer_challenge(&mut self, nonce: &str, request_id: Option<String>) {
        let digest = auth_digest(&format!(
            "{nonce}{}",
            self.config.websocket.password.expose()
        ));
        let payload = self.verify_payload(digest, None);

        self.send(
            Packet::reply(subtypes::VERIFY, data_of(&payload)).with_request_id(request_id),
        );
    }

    /// Encode and transmit one packet. A no-op while the transport is not
    /// open; nothing queues here.
    pub fn send(&mut self, packet: Packet) {
        if !self.transport.is_open() {
            return;
        }

        match serde_json::to_string(&packet) {
            Ok(text) => self.transport.send(text),
            Err(e) => error!("Failed to encode outbound packet: {e}"),
        }
    }

    fn send_timestamp_verify(&mut self) {
        let time = humantime::format_rfc3339_millis(SystemTime::now()).to_string();
        let digest = auth_digest(&format!(
            "{time}.{}",
            self.config.websocket.password.expose()
        ));
        let payload = self.verify_payload(digest, Some(time));

        self.send(Packet::request(subtypes::VERIFY, data_of(&payload)));
    }

    fn verify_payload(&self, digest: String, time: Option<String>) -> VerifyPayload {
        VerifyPayload {
            md5: digest,
            instance_id: self.identity.token(),
            custom_name: self.config.custom_name().map(str::to_string),
            time,
            metadata: self.metadata.clone(),
        }
    }
}

/// The keyed handshake digest: lowercase MD5 hex of the UTF-8 input.
pub(crate) fn auth_digest(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}
