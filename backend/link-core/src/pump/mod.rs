//! Console I/O batching.
//!
//! A busy server prints hundreds of lines a second; one packet per line
//! would drown the link. Lines accumulate here and the engine's fixed
//! 250 ms tick flushes each non-empty buffer as a single ordered batch.

use crate::protocol::{Packet, data_of, subtypes};
use crate::session::Session;
use crate::transport::Transport;

use std::mem;
use std::time::Duration;

pub const FLUSH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
pub struct IoBufferPump {
    input: Vec<String>,
    output: Vec<String>,
}

impl IoBufferPump {
    pub fn new() -> Self {
        Self::default()
    }

    /// A command line fed into the server (by the host console or the
    /// panel itself).
    pub fn on_input_line(&mut self, line: impl Into<String>) {
        self.input.push(line.into());
    }

    /// A raw output line printed by the server.
    pub fn on_output_line(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    /// Flush both buffers. Each non-empty buffer becomes exactly one
    /// broadcast carrying the whole batch in arrival order; empty buffers
    /// emit nothing. Buffers are cleared whether or not the link was open;
    /// stale console lines are worthless after a reconnect.
    pub fn flush<T: Transport>(&mut self, session: &mut Session<T>) {
        if !self.input.is_empty() {
            let lines = mem::take(&mut self.input);
            session.send(Packet::event(subtypes::SERVER_INPUT, data_of(&lines)));
        }

        if !self.output.is_empty() {
            let lines = mem::take(&mut self.output);
            session.send(Packet::event(subtypes::SERVER_OUTPUT, data_of(&lines)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }
}
