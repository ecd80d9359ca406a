//! Simulated host and GPU sources for demo mode and tests.
//!
//! Randomness comes from a generator owned by each source.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::gpu::{GpuDevice, GpuDriver};
use super::metrics::{CpuSection, MemorySection};
use super::provider::HostSource;
use super::registry::{ProcessReading, ProcessSource};
use crate::error::Result;

const GIB: u64 = 1024 * 1024 * 1024;
const CORES: usize = 8;
const PROCESS_COUNT: u32 = 50;
const FIRST_PID: u32 = 1000;
const GPU_USER_COUNT: u32 = 5;
const BOOT_UPTIME_SECS: u64 = 3 * 3600;

const USERS: [&str; 3] = ["root", "www-data", "systemd"];
const COMMANDS: [&str; 5] = ["chrome", "code", "cargo", "kworker", "bash"];

#[derive(Debug, Clone)]
struct SyntheticProcess {
    pid: u32,
    user: &'static str,
    command: &'static str,
    cpu_time_ms: u64,
    memory_percent: f64,
    threads: u32,
}

/// Simulated 8-core host with 32 GiB of memory
pub struct SyntheticHost {
    rng: StdRng,
    started: Instant,
    cpu: CpuSection,
    disk: (u64, u64),
    network: (u64, u64),
    processes: Vec<SyntheticProcess>,
}

impl SyntheticHost {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible sequence, for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let processes = (0..PROCESS_COUNT)
            .map(|i| SyntheticProcess {
                pid: FIRST_PID + i,
                user: USERS[rng.random_range(0..USERS.len())],
                command: COMMANDS[rng.random_range(0..COMMANDS.len())],
                cpu_time_ms: rng.random_range(0..60_000),
                memory_percent: rng.random::<f64>() * 2.0,
                threads: rng.random_range(1..32),
            })
            .collect();

        Self {
            rng,
            started: Instant::now(),
            cpu: CpuSection::default(),
            disk: (0, 0),
            network: (0, 0),
            processes,
        }
    }
}

impl Default for SyntheticHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SyntheticHost {
    fn process_ids(&mut self) -> Result<Vec<u32>> {
        Ok(self.processes.iter().map(|p| p.pid).collect())
    }

    fn read_process(&self, pid: u32) -> Option<ProcessReading> {
        let process = self.processes.iter().find(|p| p.pid == pid)?;
        Some(ProcessReading {
            pid,
            user: process.user.to_string(),
            command: process.command.to_string(),
            state: "R".to_string(),
            cpu_time_ms: process.cpu_time_ms,
            memory_percent: process.memory_percent,
            rss_bytes: (process.memory_percent / 100.0 * (32 * GIB) as f64) as u64,
            threads: process.threads,
            nice: 0,
            parent_pid: Some(1),
        })
    }

    fn logical_cores(&self) -> usize {
        CORES
    }
}

impl HostSource for SyntheticHost {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn refresh(&mut self) {
        let per_core_usage: Vec<f64> = (0..CORES)
            .map(|_| 10.0 + self.rng.random::<f64>() * 30.0)
            .collect();
        let per_core_temp = (0..CORES)
            .map(|_| 40.0 + self.rng.random::<f64>() * 10.0)
            .collect();

        self.cpu = CpuSection {
            global_usage_percent: per_core_usage.iter().sum::<f64>() / CORES as f64,
            per_core_usage,
            per_core_temp,
            load_average: [1.5, 1.2, 0.8],
        };

        self.disk.0 += self.rng.random_range(4_096..2_000_000);
        self.disk.1 += self.rng.random_range(4_096..1_000_000);
        self.network.0 += self.rng.random_range(1_024..500_000);
        self.network.1 += self.rng.random_range(1_024..5_000_000);

        for process in &mut self.processes {
            process.cpu_time_ms += self.rng.random_range(0..50);
        }
    }

    fn uptime_secs(&self) -> u64 {
        BOOT_UPTIME_SECS + self.started.elapsed().as_secs()
    }

    fn cpu(&self) -> Result<CpuSection> {
        Ok(self.cpu.clone())
    }

    fn memory(&self) -> Result<MemorySection> {
        Ok(MemorySection::from_bytes(32 * GIB, 12 * GIB, 20 * GIB, 4 * GIB, 0))
    }

    fn disk_counters(&self) -> Result<(u64, u64)> {
        Ok(self.disk)
    }

    fn network_counters(&self) -> Result<(u64, u64)> {
        Ok(self.network)
    }
}

/// Hands out simulated RTX-class devices
pub struct SyntheticGpuDriver {
    rng: StdRng,
}

impl SyntheticGpuDriver {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SyntheticGpuDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDriver for SyntheticGpuDriver {
    fn vendor(&self) -> &'static str {
        "Synthetic"
    }

    fn open(&mut self) -> Result<Box<dyn GpuDevice>> {
        let rng = StdRng::seed_from_u64(self.rng.random());
        Ok(Box::new(SyntheticGpu { rng }))
    }
}

struct SyntheticGpu {
    rng: StdRng,
}

impl GpuDevice for SyntheticGpu {
    fn name(&mut self) -> Result<String> {
        Ok("NVIDIA GeForce RTX 4090".to_string())
    }

    fn utilization(&mut self) -> Result<u32> {
        Ok(self.rng.random_range(50..80))
    }

    fn memory(&mut self) -> Result<(u64, u64)> {
        Ok((24 * GIB, 8 * GIB))
    }

    fn temperature(&mut self) -> Result<u32> {
        Ok(self.rng.random_range(60..70))
    }

    fn fan_speed(&mut self) -> Result<u32> {
        Ok(self.rng.random_range(40..50))
    }

    fn power(&mut self) -> Result<(u32, u32)> {
        Ok((150_000, 450_000))
    }

    fn process_ids(&mut self) -> Result<Vec<u32>> {
        Ok((FIRST_PID..FIRST_PID + GPU_USER_COUNT).collect())
    }

    fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
