//! Machine metrics for the heartbeat reply.

use crate::protocol::SystemSnapshot;

use std::sync::Mutex;

use sysinfo::System;

/// Source of the heartbeat's machine half.
///
/// Trait-backed so tests can pin the values; production uses
/// [`SysinfoProbe`]. A probe must never fail: anything it cannot answer
/// is `None` and reaches the panel as `null`.
pub trait SystemProbe: Send + Sync {
    fn snapshot(&self) -> SystemSnapshot;
}

/// sysinfo-backed probe.
///
/// Keeps one `System` alive across calls so CPU usage is measured against
/// the previous refresh instead of starting cold every heartbeat.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn snapshot(&self) -> SystemSnapshot {
        let Ok(mut system) = self.system.lock() else {
            // A poisoned lock means a panic elsewhere; report nulls
            // rather than joining it.
            return SystemSnapshot::default();
        };

        system.refresh_cpu_usage();
        system.refresh_memory();

        SystemSnapshot {
            os: System::name(),
            cpu_name: system.cpus().first().map(|cpu| cpu.brand().to_string()),
            total_ram: Some(system.total_memory()),
            free_ram: Some(system.free_memory()),
            cpu_usage: Some(f64::from(system.global_cpu_usage())),
        }
    }
}
