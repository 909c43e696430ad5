//! Core engine linking a managed game-server host to a remote control panel.
//!
//! The engine maintains one logical WebSocket connection to the panel,
//! performs the authenticated handshake, dispatches the panel's typed
//! request/event packets to the host's server-lifecycle operations, and
//! streams buffered console I/O back as periodic broadcasts.
//!
//! ## Architecture
//!
//! - **common**: shared leaf types (`ErrorLocation`, `RedactedSecret`)
//! - **link-core** (this crate): session state machine, protocol router,
//!   path sandbox, transport binding, and the engine task tying them together
//!
//! The embedding host supplies a [`host::ServerHost`] implementation and a
//! data directory, then drives the engine through a [`link::LinkHandle`].

pub mod config;
pub mod error;
pub mod host;
pub mod identity;
pub mod link;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod pump;
pub mod router;
pub mod sandbox;
pub mod session;
pub mod transport;

#[cfg(test)]
mod tests;

/// Version reported to the panel in the handshake metadata.
pub const LINK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default panel endpoint written into a freshly created config file.
pub const DEFAULT_PANEL_ADDR: &str = "ws://127.0.0.1:30000/ws/instance";
