//! Provider contract and the sampler that composes every tracker into one snapshot.

use std::time::Instant;

use super::gpu::GpuDriver;
use super::health::{GpuHealthMonitor, HealthPolicy};
use super::history::HistoryRingBuffer;
use super::metrics::*;
use super::rate::IoRates;
use super::registry::{ProcessRegistry, ProcessSource};
use super::synthetic::{SyntheticGpuDriver, SyntheticHost};
use crate::core::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::platform::gpu::default_gpu_driver;
use crate::platform::host::SysinfoHost;

/// Public contract consumed by the polling loop
pub trait MetricsProvider {
    /// Acquire host facilities and try the GPU. Only host failures are errors.
    fn init(&mut self) -> Result<()>;

    /// Produce one snapshot. Never fails; broken sources degrade their section.
    fn sample(&mut self) -> Snapshot;

    /// Release the GPU handle. Idempotent, safe without a successful `init`.
    fn shutdown(&mut self);
}

/// Host facilities other than the GPU
pub trait HostSource: ProcessSource + Send {
    fn connect(&mut self) -> Result<()>;

    /// Refresh cached host state once per cycle, before any section read
    fn refresh(&mut self);

    fn uptime_secs(&self) -> u64;

    fn cpu(&self) -> Result<CpuSection>;

    fn memory(&self) -> Result<MemorySection>;

    /// Cumulative `(read, written)` disk bytes
    fn disk_counters(&self) -> Result<(u64, u64)>;

    /// Cumulative `(sent, received)` network bytes
    fn network_counters(&self) -> Result<(u64, u64)>;
}

/// Which source set backs the provider; chosen once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Live,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Ready,
    ShutDown,
}

/// Composes host reads, rate tracking, process registry, GPU health and history
pub struct Sampler<H: HostSource> {
    host: H,
    gpu: GpuHealthMonitor,
    rates: IoRates,
    registry: ProcessRegistry,
    history: HistoryRingBuffer<f64>,
    last_cpu: CpuSection,
    last_memory: MemorySection,
    last_disk: DiskSection,
    last_network: NetworkSection,
    last_timestamp: Option<Instant>,
    lifecycle: Lifecycle,
}

pub type LiveProvider = Sampler<SysinfoHost>;
pub type SyntheticProvider = Sampler<SyntheticHost>;

impl<H: HostSource> Sampler<H> {
    pub fn new(host: H, driver: Box<dyn GpuDriver>, config: &MonitorConfig) -> Self {
        Self::with_policy(host, driver, config, HealthPolicy::default())
    }

    pub fn with_policy(
        host: H,
        driver: Box<dyn GpuDriver>,
        config: &MonitorConfig,
        policy: HealthPolicy,
    ) -> Self {
        Self {
            host,
            gpu: GpuHealthMonitor::new(driver, policy),
            rates: IoRates::default(),
            registry: ProcessRegistry::new(config.max_processes),
            history: HistoryRingBuffer::with_capacity(config.gpu_history_length),
            last_cpu: CpuSection::default(),
            last_memory: MemorySection::default(),
            last_disk: DiskSection::default(),
            last_network: NetworkSection::default(),
            last_timestamp: None,
            lifecycle: Lifecycle::Created,
        }
    }

    fn init_at(&mut self, now: Instant) -> Result<()> {
        if self.lifecycle == Lifecycle::Ready {
            return Ok(());
        }

        self.host
            .connect()
            .map_err(|e| MonitorError::initialization(format!("host metrics: {}", e)))?;
        self.gpu.start(now);
        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    /// `sample` with an explicit clock, for deterministic callers
    pub fn sample_at(&mut self, now: Instant) -> Snapshot {
        if self.lifecycle == Lifecycle::Created {
            if let Err(e) = self.init_at(now) {
                log::warn!("Sampling without a successful init: {}", e);
            }
        }

        let timestamp = match self.last_timestamp {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        self.host.refresh();

        let mut snapshot = Snapshot::empty(timestamp);
        snapshot.uptime_secs = self.host.uptime_secs();
        snapshot.cpu = self.sample_cpu();
        snapshot.memory = self.sample_memory();
        snapshot.disk = self.sample_disk(timestamp);
        snapshot.network = self.sample_network(timestamp);

        let gpu = self.gpu.poll(timestamp);
        if let Some(utilization) = gpu.utilization_sample {
            self.history.push(utilization as f64);
        }
        snapshot.gpu = GpuSection {
            history: self.history.to_vec(),
            ..gpu.section
        };

        snapshot.processes = match self.host.process_ids() {
            Ok(pids) => {
                let scanned = self.registry.scan_list(&pids);
                self.host.refresh_processes(&scanned);
                self.registry
                    .sample(&self.host, &scanned, &gpu.process_ids, timestamp)
            }
            Err(e) => {
                log::warn!("Process enumeration failed: {}", e);
                self.registry.clear();
                Vec::new()
            }
        };

        snapshot
    }

    fn sample_cpu(&mut self) -> CpuSection {
        match self.host.cpu() {
            Ok(mut cpu) => {
                cpu.global_usage_percent = clamp_percent(cpu.global_usage_percent);
                cpu.per_core_usage.iter_mut().for_each(|v| *v = clamp_percent(*v));
                self.last_cpu = cpu.clone();
                cpu
            }
            Err(e) => {
                log::warn!("CPU metrics degraded: {}", e);
                self.last_cpu.clone()
            }
        }
    }

    fn sample_memory(&mut self) -> MemorySection {
        match self.host.memory() {
            Ok(memory) => {
                self.last_memory = memory.clone();
                memory
            }
            Err(e) => {
                log::warn!("Memory metrics degraded: {}", e);
                self.last_memory.clone()
            }
        }
    }

    fn sample_disk(&mut self, now: Instant) -> DiskSection {
        let disk = match self.host.disk_counters() {
            Ok((read, written)) => DiskSection {
                read_bytes: read,
                write_bytes: written,
                read_bytes_per_sec: self.rates.disk_read.update(read, now),
                write_bytes_per_sec: self.rates.disk_write.update(written, now),
            },
            Err(e) => {
                log::warn!("Disk counters degraded: {}", e);
                DiskSection {
                    read_bytes_per_sec: 0,
                    write_bytes_per_sec: 0,
                    ..self.last_disk.clone()
                }
            }
        };
        self.last_disk = disk.clone();
        disk
    }

    fn sample_network(&mut self, now: Instant) -> NetworkSection {
        let network = match self.host.network_counters() {
            Ok((sent, received)) => NetworkSection {
                bytes_sent: sent,
                bytes_received: received,
                upload_bytes_per_sec: self.rates.net_sent.update(sent, now),
                download_bytes_per_sec: self.rates.net_received.update(received, now),
            },
            Err(e) => {
                log::warn!("Network counters degraded: {}", e);
                NetworkSection {
                    upload_bytes_per_sec: 0,
                    download_bytes_per_sec: 0,
                    ..self.last_network.clone()
                }
            }
        };
        self.last_network = network.clone();
        network
    }

    pub fn gpu_monitor(&self) -> &GpuHealthMonitor {
        &self.gpu
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryRingBuffer<f64> {
        &self.history
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: HostSource> MetricsProvider for Sampler<H> {
    fn init(&mut self) -> Result<()> {
        self.init_at(Instant::now())
    }

    fn sample(&mut self) -> Snapshot {
        self.sample_at(Instant::now())
    }

    fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::ShutDown {
            return;
        }
        self.gpu.shutdown();
        self.lifecycle = Lifecycle::ShutDown;
        log::info!("Metrics provider shut down");
    }
}

/// Build the provider for `mode`
pub fn build_provider(mode: ProviderMode, config: &MonitorConfig) -> Box<dyn MetricsProvider> {
    match mode {
        ProviderMode::Live => Box::new(LiveProvider::new(
            SysinfoHost::new(),
            default_gpu_driver(),
            config,
        )),
        ProviderMode::Synthetic => Box::new(SyntheticProvider::new(
            SyntheticHost::new(),
            Box::new(SyntheticGpuDriver::new()),
            config,
        )),
    }
}
