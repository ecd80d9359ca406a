//! System monitoring core functionality.
//!
//! This module provides the metrics-acquisition layer: the snapshot model,
//! counter rates, per-process sampling, GPU health tracking and alerting.

pub mod alerts;
mod gpu;
mod health;
mod history;
mod metrics;
mod provider;
mod rate;
mod registry;
mod synthetic;

pub use alerts::{
    evaluate_alerts, AlertCondition, AlertEvaluator, AlertKind, AlertOutcome, AlertThresholds,
    NotificationRequest, NotificationSink, Urgency,
};
pub use gpu::{GpuDevice, GpuDriver, GpuFacet};
pub use health::{GpuHealthMonitor, GpuPoll, HealthPolicy};
pub use history::HistoryRingBuffer;
pub use metrics::{
    clamp_percent, memory_percent, ratio_percent, CpuSection, DiskSection, GpuHealthStatus,
    GpuSection, MemorySection, NetworkSection, ProcessInfo, Snapshot,
};
pub use provider::{
    build_provider, HostSource, LiveProvider, MetricsProvider, ProviderMode, Sampler,
    SyntheticProvider,
};
pub use rate::{IoRates, RateTracker};
pub use registry::{ProcessReading, ProcessRegistry, ProcessSource};
pub use synthetic::{SyntheticGpuDriver, SyntheticHost};
