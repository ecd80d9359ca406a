#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, Device, Nvml};

use crate::core::system_monitor::{GpuDevice, GpuDriver};
#[cfg(feature = "nvml")]
use crate::error::MonitorError;
use crate::error::Result;

/// NVIDIA GPU driver using NVML
pub struct NvidiaGpuDriver {
    device_index: u32,
}

impl NvidiaGpuDriver {
    pub fn new() -> Self {
        Self::with_device_index(0)
    }

    /// Driver for a specific GPU index
    pub fn with_device_index(index: u32) -> Self {
        Self {
            device_index: index,
        }
    }
}

impl Default for NvidiaGpuDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDriver for NvidiaGpuDriver {
    fn vendor(&self) -> &'static str {
        "NVIDIA"
    }

    fn open(&mut self) -> Result<Box<dyn GpuDevice>> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                MonitorError::sensor_unavailable(format!("Failed to init NVML: {}", e))
            })?;

            let count = nvml.device_count().map_err(|e| {
                MonitorError::sensor_unavailable(format!("Failed to count GPUs: {}", e))
            })?;
            if count <= self.device_index {
                let _ = nvml.shutdown();
                return Err(MonitorError::sensor_unavailable(format!(
                    "GPU {} not found ({} devices)",
                    self.device_index, count
                )));
            }

            if let Err(e) = nvml.device_by_index(self.device_index) {
                let _ = nvml.shutdown();
                return Err(MonitorError::sensor_unavailable(format!(
                    "GPU {} not accessible: {}",
                    self.device_index, e
                )));
            }

            log::info!("NVML initialized, using GPU {}", self.device_index);
            Ok(Box::new(NvmlDevice {
                nvml,
                index: self.device_index,
            }))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(crate::error::MonitorError::sensor_unavailable(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}

/// An open NVML session bound to one device index
///
/// `Device` borrows the session, so it is looked up again for every read.
#[cfg(feature = "nvml")]
struct NvmlDevice {
    nvml: Nvml,
    index: u32,
}

#[cfg(feature = "nvml")]
impl NvmlDevice {
    fn device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.index)
            .map_err(|e| MonitorError::transient_sensor(format!("Failed to get GPU device: {}", e)))
    }
}

#[cfg(feature = "nvml")]
fn read_failed(what: &str, e: nvml_wrapper::error::NvmlError) -> MonitorError {
    MonitorError::transient_sensor(format!("Failed to read GPU {}: {}", what, e))
}

#[cfg(feature = "nvml")]
impl GpuDevice for NvmlDevice {
    fn name(&mut self) -> Result<String> {
        self.device()?.name().map_err(|e| read_failed("name", e))
    }

    fn utilization(&mut self) -> Result<u32> {
        self.device()?
            .utilization_rates()
            .map(|u| u.gpu)
            .map_err(|e| read_failed("utilization", e))
    }

    fn memory(&mut self) -> Result<(u64, u64)> {
        self.device()?
            .memory_info()
            .map(|info| (info.total, info.used))
            .map_err(|e| read_failed("memory", e))
    }

    fn temperature(&mut self) -> Result<u32> {
        self.device()?
            .temperature(TemperatureSensor::Gpu)
            .map_err(|e| read_failed("temperature", e))
    }

    fn fan_speed(&mut self) -> Result<u32> {
        self.device()?
            .fan_speed(0)
            .map_err(|e| read_failed("fan speed", e))
    }

    fn power(&mut self) -> Result<(u32, u32)> {
        let device = self.device()?;
        let usage = device.power_usage().map_err(|e| read_failed("power", e))?;
        let limit = device
            .enforced_power_limit()
            .map_err(|e| read_failed("power limit", e))?;
        Ok((usage, limit))
    }

    fn process_ids(&mut self) -> Result<Vec<u32>> {
        let device = self.device()?;
        let mut pids: Vec<u32> = device
            .running_compute_processes()
            .map_err(|e| read_failed("compute processes", e))?
            .into_iter()
            .map(|p| p.pid)
            .collect();

        // Graphics contexts are optional on headless cards
        if let Ok(graphics) = device.running_graphics_processes() {
            pids.extend(graphics.into_iter().map(|p| p.pid));
        }

        pids.sort_unstable();
        pids.dedup();
        Ok(pids)
    }

    fn release(self: Box<Self>) -> Result<()> {
        self.nvml
            .shutdown()
            .map_err(|e| MonitorError::shutdown(format!("NVML shutdown failed: {}", e)))
    }
}
