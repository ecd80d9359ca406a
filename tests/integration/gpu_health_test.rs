use std::time::{Duration, Instant};

use omnitop::core::system_monitor::{GpuFacet, GpuHealthStatus, Sampler};
use omnitop::MonitorConfig;

use super::support::{ScriptedGpu, ScriptedHost};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn sampler(gpu: &ScriptedGpu) -> Sampler<ScriptedHost> {
    Sampler::new(ScriptedHost::new(1), gpu.driver(), &MonitorConfig::default())
}

#[test]
fn test_minority_failures_degrade_then_trip() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    let healthy = provider.sample_at(t0);
    assert_eq!(healthy.gpu.health, GpuHealthStatus::Healthy);
    let first_success = healthy.gpu.last_success;

    gpu.with(|s| {
        s.failing.insert(GpuFacet::Temperature);
        s.failing.insert(GpuFacet::Fan);
        s.failing.insert(GpuFacet::Power);
    });

    for cycle in 1..=4 {
        let snapshot = provider.sample_at(t0 + secs(cycle));
        assert_eq!(snapshot.gpu.health, GpuHealthStatus::Degraded);
        assert!(snapshot.gpu.available);
        assert_eq!(snapshot.gpu.error_count, cycle as u32);
        // Failed facets keep their last values
        assert_eq!(snapshot.gpu.fan_speed_percent, 30);
        assert_eq!(snapshot.gpu.last_success, first_success);
    }

    let tripped = provider.sample_at(t0 + secs(5));
    assert_eq!(tripped.gpu.health, GpuHealthStatus::Failed);
    assert!(!tripped.gpu.available);
    assert!(tripped.gpu.last_error.as_deref().unwrap().contains("power"));
    assert_eq!(gpu.with(|s| s.releases), 1);
    assert_eq!(provider.gpu_monitor().facet_failures(GpuFacet::Fan), 5);
    assert_eq!(provider.gpu_monitor().facet_failures(GpuFacet::Name), 0);
}

#[test]
fn test_unsupported_fan_keeps_gpu_available() {
    let gpu = ScriptedGpu::new();
    gpu.with(|s| {
        s.failing.insert(GpuFacet::Fan);
        s.pids = vec![7];
    });
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    for n in 0..120 {
        let snapshot = provider.sample_at(t0 + secs(n));
        assert!(snapshot.gpu.available, "lost the GPU at cycle {}", n);
        assert_eq!(snapshot.gpu.health, GpuHealthStatus::Healthy);
        assert_eq!(snapshot.gpu.error_count, 0);
        assert_eq!(snapshot.gpu.utilization_percent, 42);
    }

    let last = provider.sample_at(t0 + secs(120));
    assert!(last.gpu.last_error.as_deref().unwrap().starts_with("fan:"));
    assert_eq!(last.gpu.history.len(), 100);
    assert_eq!(gpu.with(|s| (s.opens, s.releases)), (1, 0));
    assert_eq!(provider.gpu_monitor().facet_failures(GpuFacet::Fan), 121);
}

#[test]
fn test_majority_cycle_ends_failure_streak() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    gpu.with(|s| {
        s.failing
            .extend([GpuFacet::Name, GpuFacet::Memory, GpuFacet::Power])
    });
    for n in 0..4 {
        let snapshot = provider.sample_at(t0 + secs(n));
        assert_eq!(snapshot.gpu.health, GpuHealthStatus::Degraded);
    }
    assert_eq!(provider.gpu_monitor().error_count(), 4);

    // One facet still failing, five succeed
    gpu.with(|s| {
        s.failing.remove(&GpuFacet::Name);
        s.failing.remove(&GpuFacet::Memory);
    });
    let recovered = provider.sample_at(t0 + secs(4));
    assert_eq!(recovered.gpu.health, GpuHealthStatus::Healthy);
    assert_eq!(recovered.gpu.error_count, 0);

    // A fresh streak is needed before the circuit can open again
    gpu.with(|s| {
        s.failing
            .extend([GpuFacet::Name, GpuFacet::Memory, GpuFacet::Power])
    });
    let again = provider.sample_at(t0 + secs(5));
    assert_eq!(again.gpu.health, GpuHealthStatus::Degraded);
    assert_eq!(again.gpu.error_count, 1);
    assert!(again.gpu.available);
}

#[test]
fn test_total_failure_trips_immediately() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    gpu.with(|s| s.failing.extend(GpuFacet::ALL));
    let snapshot = provider.sample_at(t0);
    assert_eq!(snapshot.gpu.health, GpuHealthStatus::Failed);
    assert!(provider.gpu_monitor().is_circuit_open());
    assert!(!provider.gpu_monitor().has_device());
}

#[test]
fn test_open_circuit_makes_no_driver_calls() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    gpu.with(|s| s.failing.extend(GpuFacet::ALL));
    provider.sample_at(t0);

    let (opens, calls) = gpu.with(|s| (s.opens, s.device_calls));
    for n in 1..30 {
        let snapshot = provider.sample_at(t0 + secs(n));
        assert!(!snapshot.gpu.available);
        assert!(snapshot.gpu.history.is_empty());
    }
    assert_eq!(gpu.with(|s| (s.opens, s.device_calls)), (opens, calls));
}

#[test]
fn test_retries_are_capped_per_window() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    gpu.with(|s| {
        s.failing.extend(GpuFacet::ALL);
        s.open_fails = true;
    });
    provider.sample_at(t0);
    assert_eq!(gpu.with(|s| s.opens), 1);

    // Cooldown elapsed: one attempt per cycle, three per window
    for n in 31..=33 {
        provider.sample_at(t0 + secs(n));
    }
    assert_eq!(gpu.with(|s| s.opens), 4);
    assert_eq!(provider.gpu_monitor().retry_attempts(), 3);

    for n in 34..63 {
        provider.sample_at(t0 + secs(n));
    }
    assert_eq!(gpu.with(|s| s.opens), 4);

    // Next window opens 30s after the last attempt
    provider.sample_at(t0 + secs(63));
    assert_eq!(gpu.with(|s| s.opens), 5);
}

#[test]
fn test_recovery_after_cooldown() {
    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    let t0 = Instant::now();

    gpu.with(|s| s.failing.extend(GpuFacet::ALL));
    provider.sample_at(t0);

    gpu.with(|s| s.failing.clear());
    let recovered = provider.sample_at(t0 + secs(31));
    assert_eq!(recovered.gpu.health, GpuHealthStatus::Healthy);
    assert!(recovered.gpu.available);
    assert_eq!(recovered.gpu.error_count, 0);
    assert_eq!(recovered.gpu.retry_attempts, 0);
    assert_eq!(recovered.gpu.utilization_percent, 42);
    assert_eq!(gpu.with(|s| s.opens), 2);
}

#[test]
fn test_shutdown_releases_once() {
    use omnitop::MetricsProvider;

    let gpu = ScriptedGpu::new();
    let mut provider = sampler(&gpu);
    provider.init().unwrap();
    provider.sample();

    provider.shutdown();
    provider.shutdown();
    assert_eq!(gpu.with(|s| s.releases), 1);
}
