//! Process resource sampling backing the queue's soft/hard ceilings
//! (spec §4.F backpressure, §5 hard ceiling).

use parking_lot::Mutex;
use std::process;
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSample {
    pub memory_mb: u64,
    pub cpu_percent: f32,
}

/// Wraps a single `sysinfo::System`, refreshed in place on each sample
/// rather than reconstructed, since a fresh `System` can't report a
/// meaningful CPU delta.
pub struct ResourceMonitor {
    system: Mutex<System>,
    pid: Pid,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        let pid = Pid::from_u32(process::id());
        let mut system = System::new_all();
        system.refresh_processes(ProcessesToUpdate::All, true);
        Self { system: Mutex::new(system), pid }
    }

    pub fn sample(&self) -> ResourceSample {
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        match system.process(self.pid) {
            Some(p) => ResourceSample {
                memory_mb: p.memory() / (1024 * 1024),
                cpu_percent: p.cpu_usage(),
            },
            None => ResourceSample::default(),
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_the_current_process_never_panics() {
        let monitor = ResourceMonitor::new();
        let sample = monitor.sample();
        // Just needs to not panic; actual values are environment-dependent.
        let _ = sample.memory_mb;
        let _ = sample.cpu_percent;
    }
}
