//! Engine wiring: one task owns the session, the router, and the pump.
//!
//! Everything with mutable state runs on a single engine task that
//! multiplexes four event sources: transport notifications, host notices,
//! the periodic flush tick, and the single optional retry timer. Events
//! run to completion one at a time, so none of the state needs locking.

use crate::config::LinkConfig;
use crate::host::ServerHost;
use crate::identity::InstanceId;
use crate::metrics::{SysinfoProbe, SystemProbe};
use crate::protocol::{HostMetadata, Packet, subtypes};
use crate::pump::{FLUSH_INTERVAL, IoBufferPump};
use crate::router::ProtocolRouter;
use crate::sandbox::PathResolver;
use crate::session::Session;
use crate::transport::{Transport, TransportEvent, WsTransport};

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, Sleep, interval, sleep};

/// What the embedding host reports into the engine.
#[derive(Debug)]
enum HostNotice {
    Connect,
    ServerStarted,
    ServerStopped(i32),
    CommandSent(String),
    OutputLine(String),
}

/// The host's grip on the engine: `connect()` once after process init,
/// plus the four lifecycle forwarding hooks. Cloneable and cheap.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    notices: mpsc::UnboundedSender<HostNotice>,
}

impl LinkHandle {
    /// Start (or, out of the terminal state, restart) the connection.
    pub fn connect(&self) {
        let _ = self.notices.send(HostNotice::Connect);
    }

    /// The server subprocess came up. Broadcast immediately.
    pub fn on_server_started(&self) {
        let _ = self.notices.send(HostNotice::ServerStarted);
    }

    /// The server subprocess exited. Broadcast immediately with the code.
    pub fn on_server_stopped(&self, code: i32) {
        let _ = self.notices.send(HostNotice::ServerStopped(code));
    }

    /// A command line was fed to the server. Batched.
    pub fn on_command_sent(&self, line: impl Into<String>) {
        let _ = self.notices.send(HostNotice::CommandSent(line.into()));
    }

    /// The server printed an output line. Batched.
    pub fn on_output_line(&self, line: impl Into<String>) {
        let _ = self.notices.send(HostNotice::OutputLine(line.into()));
    }
}

/// Start the engine with the production WebSocket transport and the
/// sysinfo-backed system probe.
///
/// `sandbox_root` is the directory the panel may browse, typically the
/// game-server directory. Must be called from within a tokio runtime.
pub fn start(
    config: Arc<LinkConfig>,
    identity: InstanceId,
    host: Arc<dyn ServerHost>,
    metadata: HostMetadata,
    sandbox_root: impl Into<PathBuf>,
) -> LinkHandle {
    let (transport, events) = WsTransport::new(config.websocket.addr.clone());
    let probe: Arc<dyn SystemProbe> = Arc::new(SysinfoProbe::new());

    spawn_with(
        config,
        identity,
        host,
        probe,
        metadata,
        sandbox_root,
        transport,
        events,
    )
}

/// Start the engine over an arbitrary transport and probe.
#[allow(clippy::too_many_arguments)]
pub fn spawn_with<T: Transport>(
    config: Arc<LinkConfig>,
    identity: InstanceId,
    host: Arc<dyn ServerHost>,
    probe: Arc<dyn SystemProbe>,
    metadata: HostMetadata,
    sandbox_root: impl Into<PathBuf>,
    transport: T,
    events: mpsc::UnboundedReceiver<TransportEvent>,
) -> LinkHandle {
    let (notices_tx, notices_rx) = mpsc::unbounded_channel();

    let session = Session::new(transport, config, identity, metadata);
    let router = ProtocolRouter::new(host, probe, PathResolver::new(sandbox_root));

    tokio::spawn(run_engine(session, router, events, notices_rx));

    LinkHandle {
        notices: notices_tx,
    }
}

async fn run_engine<T: Transport>(
    mut session: Session<T>,
    router: ProtocolRouter,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    mut notices: mpsc::UnboundedReceiver<HostNotice>,
) {
    let mut pump = IoBufferPump::new();

    let mut flush = interval(FLUSH_INTERVAL);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The single outstanding retry timer. Armed only by a close, disarmed
    // when it fires; its existence is what makes the timer the sole
    // automatic retry source.
    let mut retry: Option<Pin<Box<Sleep>>> = None;

    loop {
        let retry_armed = retry.is_some();

        tokio::select! {
            Some(event) = transport_events.recv() => match event {
                TransportEvent::Opened => session.on_open(),
                TransportEvent::Message(text) => router.dispatch(&text, &mut session),
                TransportEvent::Closed => {
                    if let Some(delay) = session.on_close() {
                        retry = Some(Box::pin(sleep(delay)));
                    }
                }
            },

            Some(notice) = notices.recv() => match notice {
                HostNotice::Connect => {
                    if retry.is_some() {
                        debug!("Connect request ignored; a retry is already scheduled");
                    } else {
                        session.connect();
                    }
                }
                HostNotice::ServerStarted => {
                    session.send(Packet::event(subtypes::SERVER_START, None));
                }
                HostNotice::ServerStopped(code) => {
                    session.send(Packet::event(
                        subtypes::SERVER_STOP,
                        Some(Value::from(code)),
                    ));
                }
                HostNotice::CommandSent(line) => pump.on_input_line(line),
                HostNotice::OutputLine(line) => pump.on_output_line(line),
            },

            _ = flush.tick() => pump.flush(&mut session),

            _ = wait_for(&mut retry), if retry_armed => {
                retry = None;
                session.on_retry();
            },

            else => break,
        }
    }
}

/// Await the armed retry timer; pends forever when none is armed (the
/// branch guard keeps this arm out of the race in that case).
async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending::<()>().await,
    }
}
