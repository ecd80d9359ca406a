//! Per-PID sampling handles for process CPU accounting.
//!
//! CPU percent is a delta of accumulated CPU time between two sightings of
//! the same process, so each PID keeps a handle with its previous reading.
//! The registry is rebuilt every cycle from the PIDs seen in that cycle,
//! which is what evicts exited processes.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::metrics::{clamp_percent, ProcessInfo};

pub const DEFAULT_MAX_PROCESSES: usize = 200;

/// Raw per-process values read from the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReading {
    pub pid: u32,
    pub user: String,
    pub command: String,
    pub state: String,
    /// Accumulated CPU time across all cores, in milliseconds
    pub cpu_time_ms: u64,
    pub memory_percent: f64,
    pub rss_bytes: u64,
    pub threads: u32,
    pub nice: i32,
    pub parent_pid: Option<u32>,
}

/// Host facility for process enumeration
pub trait ProcessSource {
    /// PIDs in enumeration order
    fn process_ids(&mut self) -> crate::Result<Vec<u32>>;

    /// Load per-process detail for the PIDs about to be read
    fn refresh_processes(&mut self, _pids: &[u32]) {}

    /// `None` when the process vanished since enumeration
    fn read_process(&self, pid: u32) -> Option<ProcessReading>;

    /// Used to normalise CPU percent into [0, 100]
    fn logical_cores(&self) -> usize;
}

/// Cached reference point for one PID
#[derive(Debug, Clone, Copy)]
struct CpuHandle {
    cpu_time_ms: u64,
    at: Instant,
}

impl CpuHandle {
    fn new(cpu_time_ms: u64, at: Instant) -> Self {
        Self { cpu_time_ms, at }
    }

    /// Percent of total machine CPU used since the previous reading
    fn advance(&mut self, cpu_time_ms: u64, now: Instant, cores: usize) -> f64 {
        let elapsed_ms = now.saturating_duration_since(self.at).as_secs_f64() * 1000.0;
        let percent = if cpu_time_ms < self.cpu_time_ms || elapsed_ms <= 0.0 {
            // PID reuse or a clock that did not move
            0.0
        } else {
            let busy_ms = (cpu_time_ms - self.cpu_time_ms) as f64;
            busy_ms / (elapsed_ms * cores.max(1) as f64) * 100.0
        };

        self.cpu_time_ms = cpu_time_ms;
        self.at = now;
        clamp_percent(percent)
    }
}

#[derive(Debug)]
pub struct ProcessRegistry {
    handles: HashMap<u32, CpuHandle>,
    max_processes: usize,
}

impl ProcessRegistry {
    pub fn new(max_processes: usize) -> Self {
        Self {
            handles: HashMap::new(),
            max_processes,
        }
    }

    /// Sample the `scan_list` of the enumerated PIDs.
    ///
    /// PIDs beyond the cap, or that vanish before they can be read, are left
    /// out of both the result and the rebuilt registry. Vanished PIDs still
    /// count toward the cap.
    pub fn sample<S: ProcessSource + ?Sized>(
        &mut self,
        source: &S,
        pids: &[u32],
        gpu_pids: &HashSet<u32>,
        now: Instant,
    ) -> Vec<ProcessInfo> {
        let cores = source.logical_cores();
        let scanned = self.scan_list(pids);
        let mut next = HashMap::with_capacity(scanned.len());
        let mut processes = Vec::with_capacity(scanned.len());

        for pid in scanned {
            let Some(reading) = source.read_process(pid) else {
                log::trace!("Process {} exited before it could be sampled", pid);
                continue;
            };

            let (handle, cpu_percent) = match self.handles.remove(&pid) {
                Some(mut handle) => {
                    let percent = handle.advance(reading.cpu_time_ms, now, cores);
                    (handle, percent)
                }
                None => (CpuHandle::new(reading.cpu_time_ms, now), 0.0),
            };
            next.insert(pid, handle);

            processes.push(ProcessInfo {
                pid,
                user: reading.user,
                command: reading.command,
                state: reading.state,
                cpu_percent,
                memory_percent: clamp_percent(reading.memory_percent),
                rss_bytes: reading.rss_bytes,
                threads: reading.threads,
                nice: reading.nice,
                parent_pid: reading.parent_pid,
                uses_gpu: gpu_pids.contains(&pid),
            });
        }

        self.handles = next;
        processes
    }

    /// The PIDs one cycle will read: first occurrences in enumeration order,
    /// at most `max_processes` of them whether or not they can still be read
    pub fn scan_list(&self, pids: &[u32]) -> Vec<u32> {
        let mut seen = HashSet::with_capacity(pids.len().min(self.max_processes));
        pids.iter()
            .copied()
            .filter(|pid| seen.insert(*pid))
            .take(self.max_processes)
            .collect()
    }

    /// Drop every handle (used when enumeration itself failed)
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.handles.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROCESSES)
    }
}
