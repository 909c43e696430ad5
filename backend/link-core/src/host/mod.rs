//! The host-collaborator boundary.
//!
//! The engine never owns the game-server subprocess; the embedding host
//! does. This trait is the narrow surface the protocol router calls
//! through: lifecycle commands in one direction, status queries in the
//! other. The engine side of the contract (forwarding hooks, `connect`)
//! lives on [`crate::link::LinkHandle`].

/// Player-facing status block, when the server publishes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motd {
    pub max_players: u32,
    pub online_players: u32,
    pub version: Option<String>,
}

/// Server-lifecycle operations and status queries supplied by the
/// embedding host.
///
/// Command methods are fire-and-forget: the panel gets no reply packet,
/// only the resulting lifecycle broadcasts once the host reports them
/// back through the forwarding hooks. Query methods must not block and
/// must answer `None`/`false` for anything currently unavailable.
pub trait ServerHost: Send + Sync {
    fn start_server(&self);

    /// Graceful stop.
    fn stop_server(&self);

    /// Force-terminate. Destructive; the router logs it at warn.
    fn kill_server(&self);

    /// Feed one line to the server's stdin, verbatim.
    fn send_command(&self, line: &str);

    /// Is the server subprocess currently running?
    fn server_status(&self) -> bool;

    /// Binary filename of the running server, if any.
    fn server_file(&self) -> Option<String>;

    /// Human-readable uptime of the running server.
    fn server_uptime(&self) -> Option<String>;

    /// CPU usage of the server subprocess, in percent.
    fn server_cpu_usage(&self) -> Option<f64>;

    fn server_motd(&self) -> Option<Motd>;
}
