//! GPU-specific platform code.
//!
//! Provides the NVIDIA driver (via NVML) used by the live provider.

mod nvidia;

pub use nvidia::NvidiaGpuDriver;

use crate::core::system_monitor::GpuDriver;

/// Driver for the first GPU of the host
///
/// Opening it fails when NVML is missing or the `nvml` feature is disabled;
/// the health monitor then reports the GPU as unavailable.
pub fn default_gpu_driver() -> Box<dyn GpuDriver> {
    Box::new(NvidiaGpuDriver::new())
}
