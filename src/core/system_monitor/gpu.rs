use crate::error::Result;

/// Discrete GPU metric reads, each attempted once per cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuFacet {
    Name,
    Utilization,
    Memory,
    Temperature,
    Fan,
    Power,
}

impl GpuFacet {
    pub const ALL: [GpuFacet; 6] = [
        GpuFacet::Name,
        GpuFacet::Utilization,
        GpuFacet::Memory,
        GpuFacet::Temperature,
        GpuFacet::Fan,
        GpuFacet::Power,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            GpuFacet::Name => "name",
            GpuFacet::Utilization => "utilization",
            GpuFacet::Memory => "memory",
            GpuFacet::Temperature => "temperature",
            GpuFacet::Fan => "fan",
            GpuFacet::Power => "power",
        }
    }
}

impl std::fmt::Display for GpuFacet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An acquired GPU device handle
///
/// Every read is independently fallible. The handle is owned by the health
/// monitor and released explicitly; it is never reused after the circuit opens.
pub trait GpuDevice: Send {
    fn name(&mut self) -> Result<String>;

    /// Core utilization percent
    fn utilization(&mut self) -> Result<u32>;

    /// `(total, used)` in bytes
    fn memory(&mut self) -> Result<(u64, u64)>;

    fn temperature(&mut self) -> Result<u32>;

    fn fan_speed(&mut self) -> Result<u32>;

    /// `(usage, limit)` in milliwatts
    fn power(&mut self) -> Result<(u32, u32)>;

    /// PIDs with a compute or graphics context on the device
    fn process_ids(&mut self) -> Result<Vec<u32>>;

    /// Give the handle back to the driver.
    fn release(self: Box<Self>) -> Result<()>;
}

/// Trait for GPU facilities that can hand out a device handle
///
/// Implementations are provided in the platform layer (NVML) and by the
/// synthetic provider.
pub trait GpuDriver: Send {
    fn vendor(&self) -> &'static str;

    /// Acquire the facility and the first device.
    fn open(&mut self) -> Result<Box<dyn GpuDevice>>;
}
