use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One fully-populated system state value, produced once per sampling cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Monotonic capture point, non-decreasing per provider
    #[serde(skip)]
    pub timestamp: Instant,
    /// Wall-clock capture time (for display and JSON output)
    pub captured_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub cpu: CpuSection,
    pub memory: MemorySection,
    pub disk: DiskSection,
    pub network: NetworkSection,
    pub gpu: GpuSection,
    /// Order is not significant; consumers sort
    pub processes: Vec<ProcessInfo>,
}

impl Snapshot {
    /// An all-zero snapshot captured at `timestamp`
    pub fn empty(timestamp: Instant) -> Self {
        Self {
            timestamp,
            captured_at: Utc::now(),
            uptime_secs: 0,
            cpu: CpuSection::default(),
            memory: MemorySection::default(),
            disk: DiskSection::default(),
            network: NetworkSection::default(),
            gpu: GpuSection::default(),
            processes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuSection {
    pub global_usage_percent: f64,
    pub per_core_usage: Vec<f64>,
    pub per_core_temp: Vec<f64>,
    pub load_average: [f64; 3], // 1, 5, 15 min
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemorySection {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
    pub swap_percent: f64,
}

impl MemorySection {
    /// Build a section from raw byte counts, deriving both percentages
    pub fn from_bytes(total: u64, used: u64, free: u64, swap_total: u64, swap_used: u64) -> Self {
        Self {
            total_bytes: total,
            used_bytes: used,
            free_bytes: free,
            used_percent: ratio_percent(used, total),
            swap_total_bytes: swap_total,
            swap_used_bytes: swap_used,
            swap_percent: ratio_percent(swap_used, swap_total),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskSection {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_bytes_per_sec: u64,
    pub write_bytes_per_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSection {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub upload_bytes_per_sec: u64,
    pub download_bytes_per_sec: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum GpuHealthStatus {
    Healthy,
    Degraded,
    #[default]
    Failed,
}

impl std::fmt::Display for GpuHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GpuHealthStatus::Healthy => "healthy",
            GpuHealthStatus::Degraded => "degraded",
            GpuHealthStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuSection {
    pub available: bool,
    pub name: String,
    pub utilization_percent: u32,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    /// Always `memory_percent(memory_used_bytes, memory_total_bytes)`
    pub memory_util_percent: u32,
    pub temperature_celsius: u32,
    pub fan_speed_percent: u32,
    pub power_usage_mw: u32,
    pub power_limit_mw: u32,
    /// Oldest first
    pub history: Vec<f64>,
    pub health: GpuHealthStatus,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub retry_attempts: u32,
}

impl GpuSection {
    /// Set both memory counters and recompute the derived percentage.
    pub fn set_memory(&mut self, total: u64, used: u64) {
        self.memory_total_bytes = total;
        self.memory_used_bytes = used;
        self.memory_util_percent = memory_percent(used, total);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub user: String,
    pub command: String,
    pub state: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub rss_bytes: u64,
    pub threads: u32,
    pub nice: i32,
    pub parent_pid: Option<u32>,
    pub uses_gpu: bool,
}

/// `used / total` as a percentage in [0, 100]; 0 when `total` is 0
pub fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(used as f64 / total as f64 * 100.0)
}

/// Rounded GPU memory occupancy
pub fn memory_percent(used: u64, total: u64) -> u32 {
    ratio_percent(used, total).round() as u32
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
