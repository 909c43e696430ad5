//! Inbound packet dispatch.
//!
//! One dispatch table: the `type`/`subType` pair selects exactly one
//! handler. Anything else (unknown pairs, undecodable frames, malformed
//! payloads) is dropped so newer panel features degrade to silence
//! instead of killing the session.

use crate::host::ServerHost;
use crate::metrics::SystemProbe;
use crate::protocol::{
    DirEntry, DirListing, EntryKind, HeartbeatReply, Packet, PacketKind, ServerSnapshot, data_of,
    subtypes,
};
use crate::sandbox::PathResolver;
use crate::session::Session;
use crate::transport::Transport;

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

pub struct ProtocolRouter {
    host: Arc<dyn ServerHost>,
    probe: Arc<dyn SystemProbe>,
    resolver: PathResolver,
}

impl ProtocolRouter {
    pub fn new(
        host: Arc<dyn ServerHost>,
        probe: Arc<dyn SystemProbe>,
        resolver: PathResolver,
    ) -> Self {
        Self {
            host,
            probe,
            resolver,
        }
    }

    /// Decode one inbound frame and run its handler.
    pub fn dispatch<T: Transport>(&self, raw: &str, session: &mut Session<T>) {
        let Some(packet) = Packet::decode(raw) else {
            return;
        };

        match (packet.kind, packet.sub_type.as_str()) {
            (PacketKind::Event, subtypes::VERIFY_RESULT) => {
                if let Some(result) = packet.payload() {
                    session.on_verify_result(result);
                }
            }

            (PacketKind::Event, subtypes::DISCONNECTION) => {
                if let Some(event) = packet.payload() {
                    session.on_disconnection(event);
                }
            }

            (PacketKind::Request, subtypes::HEARTBEAT) => {
                self.heartbeat(packet.request_id, session);
            }

            (PacketKind::Request, subtypes::SERVER_START) => {
                info!("[{}] Starting the server", actor(&packet));
                self.host.start_server();
            }

            (PacketKind::Request, subtypes::SERVER_STOP) => {
                info!("[{}] Stopping the server", actor(&packet));
                self.host.stop_server();
            }

            (PacketKind::Request, subtypes::SERVER_KILL) => {
                warn!("[{}] Force-terminating the server", actor(&packet));
                self.host.kill_server();
            }

            (PacketKind::Request, subtypes::SERVER_INPUT) => {
                if let Some(lines) = packet.payload::<Vec<String>>() {
                    info!("[{}] Server input ({} lines)", actor(&packet), lines.len());
                    for line in &lines {
                        self.host.send_command(line);
                    }
                }
            }

            (PacketKind::Request, subtypes::GET_DIR_INFO) => {
                if let Some(path) = packet.payload::<String>() {
                    let listing = self.dir_info(&path);
                    session.send(
                        Packet::reply(subtypes::DIR_INFO, data_of(&listing))
                            .with_request_id(packet.request_id),
                    );
                }
            }

            (PacketKind::Request, subtypes::VERIFY_REQUEST) => {
                if let Some(nonce) = packet.payload::<String>() {
                    session.answer_challenge(&nonce, packet.request_id);
                }
            }

            // Forward compatibility: newer panels send packets we do not
            // know; they are not errors.
            (kind, sub_type) => {
                debug!("Ignoring unhandled packet {kind:?}/{sub_type}");
            }
        }
    }

    /// `request/heartbeat` → `return/heartbeat`. Never fails: whatever a
    /// collaborator cannot answer right now is reported as null.
    fn heartbeat<T: Transport>(&self, request_id: Option<String>, session: &mut Session<T>) {
        let system = self.probe.snapshot();

        let running = self.host.server_status();
        let motd = self.host.server_motd();
        let server = ServerSnapshot {
            status: running,
            filename: if running { self.host.server_file() } else { None },
            run_time: if running {
                self.host.server_uptime()
            } else {
                None
            },
            usage: self.host.server_cpu_usage(),
            capacity: motd.as_ref().map(|motd| motd.max_players),
            online_players: motd.as_ref().map(|motd| motd.online_players),
            version: motd.and_then(|motd| motd.version),
        };

        session.send(
            Packet::reply(
                subtypes::HEARTBEAT,
                data_of(&HeartbeatReply { system, server }),
            )
            .with_request_id(request_id),
        );
    }

    /// Resolve and enumerate one directory for `request/get_dir_info`.
    ///
    /// Escapes, invalid paths, and missing or non-directory targets all
    /// collapse into the same `exists:false` answer so a prober learns
    /// nothing about the tree outside the sandbox.
    fn dir_info(&self, requested: &str) -> DirListing {
        let resolved = self.resolver.resolve(requested);

        if !self.resolver.is_contained(&resolved) || !resolved.is_dir() {
            return DirListing::absent(requested);
        }

        let entries = match std::fs::read_dir(&resolved) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Listing {} failed: {e}", resolved.display());
                return DirListing::absent(requested);
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let Some(relative_path) = self.resolver.to_relative(&path) else {
                continue;
            };

            match entry.metadata() {
                Ok(meta) if meta.is_dir() => dirs.push(DirEntry {
                    kind: EntryKind::Dir,
                    name,
                    relative_path,
                    size: None,
                }),
                Ok(meta) if meta.is_file() => files.push(DirEntry {
                    kind: EntryKind::File,
                    name,
                    relative_path,
                    size: Some(meta.len()),
                }),
                // Sockets, broken symlinks and the like are not browsable.
                _ => {}
            }
        }

        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        dirs.extend(files);

        DirListing {
            exists: true,
            dir: requested.to_string(),
            items: Some(dirs),
        }
    }

    pub fn sandbox_root(&self) -> &Path {
        self.resolver.root()
    }
}

/// Actor attribution for command logging: the relaying peer's address
/// when the panel forwards one, "user" otherwise.
fn actor(packet: &Packet) -> &str {
    packet
        .sender
        .as_ref()
        .and_then(|sender| sender.address.as_deref())
        .unwrap_or("user")
}
