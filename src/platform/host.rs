//! Host metrics through sysinfo.

#[cfg(unix)]
use std::io;

use sysinfo::{
    Components, CpuRefreshKind, Disks, MemoryRefreshKind, Networks, Pid, ProcessRefreshKind,
    ProcessesToUpdate, RefreshKind, System, UpdateKind, Users,
};

use crate::core::system_monitor::{
    clamp_percent, ratio_percent, CpuSection, HostSource, MemorySection, ProcessReading,
    ProcessSource,
};
use crate::error::{MonitorError, Result};

/// CPU, memory, disk, network and process facilities of the local machine
pub struct SysinfoHost {
    system: System,
    components: Components,
    disks: Disks,
    networks: Networks,
    users: Users,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());

        Self {
            system: System::new_with_specifics(refresh_kind),
            components: Components::new(),
            disks: Disks::new(),
            networks: Networks::new(),
            users: Users::new(),
        }
    }

    /// Detail loaded for the PIDs a cycle actually reads
    fn process_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing()
            .with_cpu()
            .with_memory()
            .with_user(UpdateKind::OnlyIfNotSet)
            .with_tasks()
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoHost {
    fn process_ids(&mut self) -> Result<Vec<u32>> {
        let mut pids: Vec<u32> = self.system.processes().keys().map(|pid| pid.as_u32()).collect();
        if pids.is_empty() {
            return Err(MonitorError::transient_sensor("process table is empty"));
        }
        // Match /proc enumeration order
        pids.sort_unstable();
        Ok(pids)
    }

    fn refresh_processes(&mut self, pids: &[u32]) {
        let pids: Vec<Pid> = pids.iter().map(|&pid| Pid::from_u32(pid)).collect();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            Self::process_refresh_kind(),
        );
    }

    fn read_process(&self, pid: u32) -> Option<ProcessReading> {
        let process = self.system.process(Pid::from_u32(pid))?;
        let total_memory = self.system.total_memory();
        let rss = process.memory();

        let user = process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string())
            .unwrap_or_default();

        let threads = process
            .tasks()
            .map(|tasks| tasks.len() as u32)
            .filter(|&count| count > 0)
            .unwrap_or(1);

        Some(ProcessReading {
            pid,
            user,
            command: process.name().to_string_lossy().to_string(),
            state: process.status().to_string(),
            cpu_time_ms: process.accumulated_cpu_time(),
            memory_percent: ratio_percent(rss, total_memory),
            rss_bytes: rss,
            threads,
            nice: nice_value(pid),
            parent_pid: process.parent().map(|parent| parent.as_u32()),
        })
    }

    fn logical_cores(&self) -> usize {
        self.system.cpus().len().max(1)
    }
}

impl HostSource for SysinfoHost {
    fn connect(&mut self) -> Result<()> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MonitorError::initialization(
                "host metrics are not supported on this platform",
            ));
        }

        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        if self.system.cpus().is_empty() {
            return Err(MonitorError::initialization("no CPUs reported by the host"));
        }

        self.components.refresh(true);
        self.disks.refresh(true);
        self.networks.refresh(true);
        self.users.refresh();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        // CPU usage needs two measurements
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        Ok(())
    }

    fn refresh(&mut self) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.components.refresh(true);
        self.disks.refresh(true);
        self.networks.refresh(true);
        // Listing only; per-process detail comes from `refresh_processes`
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
    }

    fn uptime_secs(&self) -> u64 {
        System::uptime()
    }

    fn cpu(&self) -> Result<CpuSection> {
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(MonitorError::transient_sensor("no CPU usage data"));
        }

        let load = System::load_average();
        let per_core_temp = self
            .components
            .iter()
            .filter(|comp| comp.label().to_lowercase().contains("core"))
            .filter_map(|comp| comp.temperature())
            .map(|temp| temp as f64)
            .collect();

        Ok(CpuSection {
            global_usage_percent: clamp_percent(self.system.global_cpu_usage() as f64),
            per_core_usage: cpus
                .iter()
                .map(|cpu| clamp_percent(cpu.cpu_usage() as f64))
                .collect(),
            per_core_temp,
            load_average: [load.one, load.five, load.fifteen],
        })
    }

    fn memory(&self) -> Result<MemorySection> {
        let total = self.system.total_memory();
        if total == 0 {
            return Err(MonitorError::transient_sensor("memory totals unavailable"));
        }

        Ok(MemorySection::from_bytes(
            total,
            self.system.used_memory(),
            self.system.free_memory(),
            self.system.total_swap(),
            self.system.used_swap(),
        ))
    }

    fn disk_counters(&self) -> Result<(u64, u64)> {
        if self.disks.list().is_empty() {
            return Err(MonitorError::transient_sensor("no disks reported"));
        }

        Ok(self.disks.iter().fold((0, 0), |(read, written), disk| {
            let usage = disk.usage();
            (
                read + usage.total_read_bytes,
                written + usage.total_written_bytes,
            )
        }))
    }

    fn network_counters(&self) -> Result<(u64, u64)> {
        if self.networks.is_empty() {
            return Err(MonitorError::transient_sensor("no network interfaces reported"));
        }

        Ok(self
            .networks
            .values()
            .fold((0, 0), |(sent, received), data| {
                (
                    sent + data.total_transmitted(),
                    received + data.total_received(),
                )
            }))
    }
}

/// Scheduling priority; a failed lookup reads as 0
#[cfg(unix)]
fn nice_value(pid: u32) -> i32 {
    // -1 is both a valid nice and the error return, so errno decides
    clear_errno();
    let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
    if nice == -1 && io::Error::last_os_error().raw_os_error().unwrap_or(0) != 0 {
        return 0;
    }
    nice
}

#[cfg(target_os = "linux")]
fn clear_errno() {
    unsafe { *libc::__errno_location() = 0 }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn clear_errno() {
    unsafe { *libc::__error() = 0 }
}

#[cfg(all(
    unix,
    not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd"
    ))
))]
fn clear_errno() {}

#[cfg(not(unix))]
fn nice_value(_pid: u32) -> i32 {
    0
}
