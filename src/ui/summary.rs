//! One-line textual rendering of a snapshot for the plain console mode.

use colored::*;
use humansize::{format_size, BINARY};

use crate::core::system_monitor::{GpuHealthStatus, GpuSection, Snapshot};

/// Bytes per second in binary units, e.g. `1.50 MiB/s`
pub fn format_rate(bytes_per_sec: u64) -> String {
    format!("{}/s", format_size(bytes_per_sec, BINARY))
}

/// Colored health label
pub fn format_health(status: GpuHealthStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        GpuHealthStatus::Healthy => label.green(),
        GpuHealthStatus::Degraded => label.yellow(),
        GpuHealthStatus::Failed => label.red(),
    }
}

fn format_gpu(gpu: &GpuSection) -> String {
    if !gpu.available {
        return format!("GPU {}", format_health(gpu.health));
    }

    format!(
        "GPU {} {}% {}C {}/{} [{}]",
        gpu.name,
        gpu.utilization_percent,
        gpu.temperature_celsius,
        format_size(gpu.memory_used_bytes, BINARY),
        format_size(gpu.memory_total_bytes, BINARY),
        format_health(gpu.health)
    )
}

/// Summarise a snapshot on a single console line
pub fn format_summary(snapshot: &Snapshot) -> String {
    let cpu = &snapshot.cpu;
    let memory = &snapshot.memory;

    format!(
        "{} CPU {:>5.1}% | MEM {}/{} ({:.1}%) | DISK r {} w {} | NET up {} down {} | {} | {} procs",
        snapshot.captured_at.format("%H:%M:%S").to_string().dimmed(),
        cpu.global_usage_percent,
        format_size(memory.used_bytes, BINARY),
        format_size(memory.total_bytes, BINARY),
        memory.used_percent,
        format_rate(snapshot.disk.read_bytes_per_sec),
        format_rate(snapshot.disk.write_bytes_per_sec),
        format_rate(snapshot.network.upload_bytes_per_sec),
        format_rate(snapshot.network.download_bytes_per_sec),
        format_gpu(&snapshot.gpu),
        snapshot.processes.len()
    )
}
