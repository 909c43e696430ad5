//! The managed-socket boundary.
//!
//! The session tells a [`Transport`] to open and hands it frames; the
//! transport reports back through [`TransportEvent`] notifications on a
//! channel. The engine never sees sockets, TLS, or framing, and tests
//! swap in a scripted fake.
//!
//! [`WsTransport`] is the production binding over tokio-tungstenite.
//! Connection failures are not errors at this boundary: every failed or
//! finished connection surfaces as one `Closed` notification, which is
//! what drives the session's reconnect policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use log::warn;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Notifications a transport delivers to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
}

pub trait Transport: Send + 'static {
    /// Begin a fresh connection attempt. The caller guarantees the
    /// previous connection (if any) has already reported `Closed`.
    fn open(&mut self);

    /// Queue one text frame. Dropped silently when the socket is not open;
    /// callers that need buffering sit above this layer.
    fn send(&mut self, text: String);

    fn is_open(&self) -> bool;
}

/// WebSocket transport over tokio-tungstenite.
pub struct WsTransport {
    addr: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    open: Arc<AtomicBool>,
}

impl WsTransport {
    /// Create the transport and the notification channel the engine
    /// selects on. Nothing connects until [`Transport::open`] is called.
    pub fn new(addr: String) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let transport = Self {
            addr,
            events: events_tx,
            outbound: None,
            open: Arc::new(AtomicBool::new(false)),
        };

        (transport, events_rx)
    }
}

impl Transport for WsTransport {
    fn open(&mut self) {
        self.open.store(false, Ordering::SeqCst);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound = Some(outbound_tx);

        tokio::spawn(run_connection(
            self.addr.clone(),
            self.events.clone(),
            outbound_rx,
            Arc::clone(&self.open),
        ));
    }

    fn send(&mut self, text: String) {
        if !self.is_open() {
            return;
        }

        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(Message::text(text));
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// One connection's lifetime: connect, pump frames both ways, report
/// `Closed` exactly once at the end, whether the connect failed, the
/// peer hung up, or a write broke.
async fn run_connection(
    addr: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    open: Arc<AtomicBool>,
) {
    let (stream, _response) = match connect_async(addr.as_str()).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!("Connection to {addr} failed: {e}");
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    if events.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary/ping/pong frames carry nothing for us
                Some(Err(e)) => {
                    warn!("WebSocket read failed: {e}");
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(frame).await {
                        warn!("WebSocket send failed: {e}");
                        break;
                    }
                }
                // Sender side dropped: the transport was re-opened or torn
                // down, so this connection is done.
                None => break,
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Closed);
}
