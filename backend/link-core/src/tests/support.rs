//! Shared fakes for unit tests: a scripted transport, a recording host,
//! and a fixed-value system probe.

use crate::config::{HandshakeMode, LinkConfig, ReconnectConfig, WebsocketConfig};
use crate::host::{Motd, ServerHost};
use crate::identity::InstanceId;
use crate::metrics::SystemProbe;
use crate::protocol::{HostMetadata, SystemSnapshot};
use crate::session::Session;
use crate::transport::Transport;

use common::RedactedSecret;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

#[derive(Debug, Default)]
pub(crate) struct FakeTransportState {
    pub open_calls: u32,
    pub open: bool,
    pub sent: Vec<String>,
}

/// Test-side grip on a [`FakeTransport`]: flip openness, count connection
/// attempts, inspect sent frames. Events are injected through the channel
/// the test kept at construction.
#[derive(Clone)]
pub(crate) struct FakeTransportHandle {
    state: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransportHandle {
    pub fn open_calls(&self) -> u32 {
        self.state.lock().unwrap().open_calls
    }

    pub fn set_open(&self, open: bool) {
        self.state.lock().unwrap().open = open;
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_packets(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("sent frame is not JSON"))
            .collect()
    }
}

/// A transport that records instead of connecting. `open()` only counts
/// the attempt; the test decides whether it "succeeds" by flipping the
/// openness flag and injecting `Opened`/`Closed` events itself.
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn new() -> (Self, FakeTransportHandle) {
        let state = Arc::new(Mutex::new(FakeTransportState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeTransportHandle { state },
        )
    }
}

impl Transport for FakeTransport {
    fn open(&mut self) {
        self.state.lock().unwrap().open_calls += 1;
    }

    fn send(&mut self, text: String) {
        let mut state = self.state.lock().unwrap();
        if state.open {
            state.sent.push(text);
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

#[derive(Default)]
pub(crate) struct MockHost {
    pub running: AtomicBool,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    pub kills: AtomicU32,
    pub commands: Mutex<Vec<String>>,
    pub motd: Mutex<Option<Motd>>,
}

impl ServerHost for MockHost {
    fn start_server(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_server(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn kill_server(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }

    fn send_command(&self, line: &str) {
        self.commands.lock().unwrap().push(line.to_string());
    }

    fn server_status(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // Always answers, so tests can observe the router gating these on the
    // running flag.
    fn server_file(&self) -> Option<String> {
        Some("server.jar".to_string())
    }

    fn server_uptime(&self) -> Option<String> {
        Some("42m".to_string())
    }

    fn server_cpu_usage(&self) -> Option<f64> {
        Some(3.5)
    }

    fn server_motd(&self) -> Option<Motd> {
        self.motd.lock().unwrap().clone()
    }
}

pub(crate) struct FixedProbe;

impl SystemProbe for FixedProbe {
    fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            os: Some("TestOS 1.0".to_string()),
            cpu_name: Some("Test CPU".to_string()),
            total_ram: Some(8_000_000_000),
            free_ram: Some(4_000_000_000),
            cpu_usage: Some(12.5),
        }
    }
}

pub(crate) fn test_config() -> LinkConfig {
    LinkConfig {
        custom_name: Some("unit".to_string()),
        websocket: WebsocketConfig {
            addr: "ws://127.0.0.1:30000/ws/instance".to_string(),
            password: RedactedSecret::new("secret"),
        },
        reconnect: ReconnectConfig {
            enable: true,
            interval: 1000.0,
            max_times: 2,
        },
        handshake: HandshakeMode::Timestamp,
    }
}

pub(crate) fn test_metadata() -> HostMetadata {
    HostMetadata::new("test-host", "0.0.0")
}

/// A session over a fake transport, with a tempdir-backed identity.
pub(crate) fn test_session(
    config: LinkConfig,
) -> (Session<FakeTransport>, FakeTransportHandle, tempfile::TempDir) {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let identity = InstanceId::load(data_dir.path()).expect("identity");
    let (transport, handle) = FakeTransport::new();

    let session = Session::new(
        transport,
        std::sync::Arc::new(config),
        identity,
        test_metadata(),
    );

    (session, handle, data_dir)
}
