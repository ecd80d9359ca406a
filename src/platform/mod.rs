// Platform-specific code module

pub mod gpu;
pub mod host;
pub mod notify;

pub use gpu::{default_gpu_driver, NvidiaGpuDriver};
pub use host::SysinfoHost;
pub use notify::{DesktopNotifier, LogNotifier};
