// Scripted host and GPU sources shared by the integration tests.
//
// State lives behind Arc<Mutex<_>> so a test can keep a handle and change the
// script after the sources have been moved into a provider.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use omnitop::core::system_monitor::{
    CpuSection, GpuDevice, GpuDriver, GpuFacet, HostSource, MemorySection, ProcessReading,
    ProcessSource,
};
use omnitop::{MonitorError, Result};

#[derive(Debug, Default)]
pub struct HostScript {
    pub cores: usize,
    pub cpu_usage: f64,
    pub cpu_fails: bool,
    pub disk: (u64, u64),
    pub disk_fails: bool,
    pub network: (u64, u64),
    pub processes: BTreeMap<u32, ProcessReading>,
    pub enumeration_fails: bool,
    /// PIDs handed to each detailed refresh, one entry per cycle
    pub refreshed: Vec<Vec<u32>>,
}

impl HostScript {
    pub fn set_process(&mut self, pid: u32, cpu_time_ms: u64) {
        self.processes.insert(
            pid,
            ProcessReading {
                pid,
                user: "tester".to_string(),
                command: format!("proc-{}", pid),
                state: "Run".to_string(),
                cpu_time_ms,
                memory_percent: 1.0,
                rss_bytes: 4096,
                threads: 1,
                nice: 0,
                parent_pid: Some(1),
            },
        );
    }
}

#[derive(Clone)]
pub struct ScriptedHost {
    pub script: Arc<Mutex<HostScript>>,
}

impl ScriptedHost {
    pub fn new(cores: usize) -> Self {
        Self {
            script: Arc::new(Mutex::new(HostScript {
                cores,
                ..Default::default()
            })),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut HostScript) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }
}

impl ProcessSource for ScriptedHost {
    fn process_ids(&mut self) -> Result<Vec<u32>> {
        self.with(|s| {
            if s.enumeration_fails {
                Err(MonitorError::transient_sensor("proc unreadable"))
            } else {
                Ok(s.processes.keys().copied().collect())
            }
        })
    }

    fn refresh_processes(&mut self, pids: &[u32]) {
        self.with(|s| s.refreshed.push(pids.to_vec()));
    }

    fn read_process(&self, pid: u32) -> Option<ProcessReading> {
        self.with(|s| s.processes.get(&pid).cloned())
    }

    fn logical_cores(&self) -> usize {
        self.with(|s| s.cores)
    }
}

impl HostSource for ScriptedHost {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn refresh(&mut self) {}

    fn uptime_secs(&self) -> u64 {
        60
    }

    fn cpu(&self) -> Result<CpuSection> {
        self.with(|s| {
            if s.cpu_fails {
                return Err(MonitorError::transient_sensor("stat unreadable"));
            }
            Ok(CpuSection {
                global_usage_percent: s.cpu_usage,
                per_core_usage: vec![s.cpu_usage; s.cores],
                per_core_temp: Vec::new(),
                load_average: [0.5, 0.4, 0.3],
            })
        })
    }

    fn memory(&self) -> Result<MemorySection> {
        Ok(MemorySection::from_bytes(1000, 250, 750, 0, 0))
    }

    fn disk_counters(&self) -> Result<(u64, u64)> {
        self.with(|s| {
            if s.disk_fails {
                Err(MonitorError::transient_sensor("diskstats unreadable"))
            } else {
                Ok(s.disk)
            }
        })
    }

    fn network_counters(&self) -> Result<(u64, u64)> {
        self.with(|s| Ok(s.network))
    }
}

#[derive(Debug, Default)]
pub struct GpuScript {
    pub open_fails: bool,
    pub failing: HashSet<GpuFacet>,
    pub opens: u32,
    pub device_calls: u32,
    pub releases: u32,
    pub pids: Vec<u32>,
}

#[derive(Clone, Default)]
pub struct ScriptedGpu {
    pub script: Arc<Mutex<GpuScript>>,
}

impl ScriptedGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut GpuScript) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    pub fn driver(&self) -> Box<dyn GpuDriver> {
        Box::new(self.clone())
    }
}

impl GpuDriver for ScriptedGpu {
    fn vendor(&self) -> &'static str {
        "Scripted"
    }

    fn open(&mut self) -> Result<Box<dyn GpuDevice>> {
        self.with(|s| {
            s.opens += 1;
            if s.open_fails {
                Err(MonitorError::sensor_unavailable("driver missing"))
            } else {
                Ok(())
            }
        })?;
        Ok(Box::new(ScriptedDevice {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedDevice {
    script: Arc<Mutex<GpuScript>>,
}

impl ScriptedDevice {
    fn read<T>(&mut self, facet: GpuFacet, value: T) -> Result<T> {
        let mut s = self.script.lock().unwrap();
        s.device_calls += 1;
        if s.failing.contains(&facet) {
            Err(MonitorError::transient_sensor(format!("{} timed out", facet)))
        } else {
            Ok(value)
        }
    }
}

impl GpuDevice for ScriptedDevice {
    fn name(&mut self) -> Result<String> {
        self.read(GpuFacet::Name, "Scripted GPU".to_string())
    }

    fn utilization(&mut self) -> Result<u32> {
        self.read(GpuFacet::Utilization, 42)
    }

    fn memory(&mut self) -> Result<(u64, u64)> {
        self.read(GpuFacet::Memory, (8192, 2048))
    }

    fn temperature(&mut self) -> Result<u32> {
        self.read(GpuFacet::Temperature, 55)
    }

    fn fan_speed(&mut self) -> Result<u32> {
        self.read(GpuFacet::Fan, 30)
    }

    fn power(&mut self) -> Result<(u32, u32)> {
        self.read(GpuFacet::Power, (100_000, 300_000))
    }

    fn process_ids(&mut self) -> Result<Vec<u32>> {
        let mut s = self.script.lock().unwrap();
        s.device_calls += 1;
        Ok(s.pids.clone())
    }

    fn release(self: Box<Self>) -> Result<()> {
        self.script.lock().unwrap().releases += 1;
        Ok(())
    }
}
