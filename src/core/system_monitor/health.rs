//! GPU health tracking and circuit breaker.
//!
//! Every cycle reads the six facets of the device. A cycle with more than a
//! majority of successes is healthy and one with exactly a majority is
//! degraded; both clear the failure streak. Cycles below the majority extend
//! the streak. A long streak or a total failure opens the circuit, which
//! releases the device and suppresses all driver calls until a cooldown has
//! elapsed. After the cooldown the monitor re-acquires the device, at most
//! `max_retries` times per window.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::gpu::{GpuDevice, GpuDriver, GpuFacet};
use super::metrics::{GpuHealthStatus, GpuSection};
use crate::error::MonitorError;

pub const DEFAULT_MAJORITY: usize = 4;
pub const DEFAULT_TRIP_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Thresholds for the health state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Successful facets needed for a cycle to count as usable
    pub majority: usize,
    /// Consecutive below-majority cycles that open the circuit
    pub trip_threshold: u32,
    /// How long the circuit stays open before re-initialization
    pub cooldown: Duration,
    /// Re-initialization attempts per cooldown window
    pub max_retries: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            majority: DEFAULT_MAJORITY,
            trip_threshold: DEFAULT_TRIP_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Output of one GPU cycle
#[derive(Debug, Clone, Default)]
pub struct GpuPoll {
    /// Section without history; the provider attaches it
    pub section: GpuSection,
    /// Set only when the utilization facet succeeded this cycle
    pub utilization_sample: Option<u32>,
    pub process_ids: HashSet<u32>,
}

pub struct GpuHealthMonitor {
    driver: Box<dyn GpuDriver>,
    device: Option<Box<dyn GpuDevice>>,
    policy: HealthPolicy,
    status: GpuHealthStatus,
    error_count: u32,
    retry_attempts: u32,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
    circuit_opened_at: Option<Instant>,
    facet_failures: [u64; GpuFacet::ALL.len()],
    /// Last known value of every facet
    reading: GpuSection,
}

impl GpuHealthMonitor {
    pub fn new(driver: Box<dyn GpuDriver>, policy: HealthPolicy) -> Self {
        Self {
            driver,
            device: None,
            policy,
            status: GpuHealthStatus::Failed,
            error_count: 0,
            retry_attempts: 0,
            last_error: None,
            last_success: None,
            circuit_opened_at: None,
            facet_failures: [0; GpuFacet::ALL.len()],
            reading: GpuSection::default(),
        }
    }

    /// Acquire the device. Failure opens the circuit instead of erroring.
    pub fn start(&mut self, now: Instant) {
        if self.device.is_some() {
            return;
        }

        match self.driver.open() {
            Ok(device) => {
                log::info!("{} GPU telemetry initialized", self.driver.vendor());
                self.device = Some(device);
                self.status = GpuHealthStatus::Healthy;
                self.circuit_opened_at = None;
                self.last_success = Some(Utc::now());
            }
            Err(e) => {
                log::warn!("GPU metrics unavailable: {}", e);
                self.last_error = Some(e.to_string());
                self.open_circuit(now);
            }
        }
    }

    /// Run one cycle. Never errors; the outcome is folded into the section.
    pub fn poll(&mut self, now: Instant) -> GpuPoll {
        if let Some(opened_at) = self.circuit_opened_at {
            if now.saturating_duration_since(opened_at) < self.policy.cooldown {
                return self.unavailable();
            }
            if self.retry_attempts >= self.policy.max_retries {
                // Fresh cooldown window
                self.retry_attempts = 0;
            }
            if !self.reinitialize(now) {
                return self.unavailable();
            }
        }

        let Some(device) = self.device.as_mut() else {
            self.last_error = Some("GPU device was never acquired".to_string());
            self.open_circuit(now);
            return self.unavailable();
        };

        let mut reading = self.reading.clone();
        let mut utilization_sample = None;
        let mut failures: Vec<(GpuFacet, MonitorError)> = Vec::new();

        for facet in GpuFacet::ALL {
            let outcome = match facet {
                GpuFacet::Name => device.name().map(|name| reading.name = name),
                GpuFacet::Utilization => device.utilization().map(|util| {
                    let util = util.min(100);
                    reading.utilization_percent = util;
                    utilization_sample = Some(util);
                }),
                GpuFacet::Memory => device
                    .memory()
                    .map(|(total, used)| reading.set_memory(total, used)),
                GpuFacet::Temperature => device
                    .temperature()
                    .map(|temp| reading.temperature_celsius = temp),
                GpuFacet::Fan => device
                    .fan_speed()
                    .map(|fan| reading.fan_speed_percent = fan.min(100)),
                GpuFacet::Power => device.power().map(|(usage, limit)| {
                    reading.power_usage_mw = usage;
                    reading.power_limit_mw = limit;
                }),
            };
            if let Err(e) = outcome {
                failures.push((facet, e));
            }
        }

        let successes = GpuFacet::ALL.len() - failures.len();
        let process_ids = if successes > 0 {
            match device.process_ids() {
                Ok(pids) => pids.into_iter().collect(),
                Err(e) => {
                    log::debug!("GPU process list unavailable: {}", e);
                    HashSet::new()
                }
            }
        } else {
            HashSet::new()
        };

        self.reading = reading;
        self.apply_cycle(successes, &failures, now);

        GpuPoll {
            section: self.section(),
            utilization_sample,
            process_ids,
        }
    }

    /// Release the device if held. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.release_device();
    }

    fn apply_cycle(&mut self, successes: usize, failures: &[(GpuFacet, MonitorError)], now: Instant) {
        for (facet, err) in failures {
            self.facet_failures[facet.index()] += 1;
            log::debug!("GPU {} read failed: {}", facet, err);
        }
        if let Some((facet, err)) = failures.last() {
            self.last_error = Some(format!("{}: {}", facet, err));
        }

        if successes > 0 && successes >= self.policy.majority {
            // Majority cycles close out any failure streak
            self.error_count = 0;
            self.retry_attempts = 0;
            self.last_success = Some(Utc::now());

            let status = if successes > self.policy.majority {
                GpuHealthStatus::Healthy
            } else {
                GpuHealthStatus::Degraded
            };
            if status == GpuHealthStatus::Healthy && self.status != GpuHealthStatus::Healthy {
                log::info!(
                    "GPU metrics recovered ({}/{} facets ok)",
                    successes,
                    GpuFacet::ALL.len()
                );
            } else if status == GpuHealthStatus::Degraded && self.status == GpuHealthStatus::Healthy {
                self.log_degraded(successes);
            }
            self.status = status;
            return;
        }

        self.error_count += 1;

        if successes == 0 || self.error_count >= self.policy.trip_threshold {
            log::warn!(
                "GPU circuit breaker opened after {} failing cycles ({}/{} facets ok)",
                self.error_count,
                successes,
                GpuFacet::ALL.len()
            );
            self.open_circuit(now);
            return;
        }

        if self.status == GpuHealthStatus::Healthy {
            self.log_degraded(successes);
        }
        self.status = GpuHealthStatus::Degraded;
    }

    fn log_degraded(&self, successes: usize) {
        log::warn!(
            "GPU metrics degraded ({}/{} facets ok): {}",
            successes,
            GpuFacet::ALL.len(),
            self.last_error.as_deref().unwrap_or("unknown error")
        );
    }

    /// Release and re-acquire the device; counts as one attempt.
    fn reinitialize(&mut self, now: Instant) -> bool {
        self.retry_attempts += 1;
        log::info!(
            "Attempting GPU re-initialization (attempt {}/{})",
            self.retry_attempts,
            self.policy.max_retries
        );

        self.release_device();

        match self.driver.open() {
            Ok(device) => {
                self.device = Some(device);
                self.circuit_opened_at = None;
                self.error_count = 0;
                self.retry_attempts = 0;
                self.status = GpuHealthStatus::Healthy;
                log::info!("GPU re-initialization successful");
                true
            }
            Err(e) => {
                log::warn!("GPU re-initialization failed: {}", e);
                self.last_error = Some(format!("re-initialization: {}", e));
                if self.retry_attempts >= self.policy.max_retries {
                    log::warn!(
                        "GPU re-initialization gave up after {} attempts, next window in {:?}",
                        self.retry_attempts,
                        self.policy.cooldown
                    );
                    self.circuit_opened_at = Some(now);
                }
                false
            }
        }
    }

    fn open_circuit(&mut self, now: Instant) {
        self.status = GpuHealthStatus::Failed;
        self.circuit_opened_at = Some(now);
        self.release_device();
    }

    fn release_device(&mut self) {
        if let Some(device) = self.device.take() {
            if let Err(e) = device.release() {
                log::warn!("Failed to release GPU handle: {}", e);
            }
        }
    }

    fn section(&self) -> GpuSection {
        GpuSection {
            available: self.device.is_some() && self.status != GpuHealthStatus::Failed,
            health: self.status,
            error_count: self.error_count,
            last_error: self.last_error.clone(),
            last_success: self.last_success,
            retry_attempts: self.retry_attempts,
            history: Vec::new(),
            ..self.reading.clone()
        }
    }

    fn unavailable(&self) -> GpuPoll {
        GpuPoll {
            section: self.section(),
            utilization_sample: None,
            process_ids: HashSet::new(),
        }
    }

    pub fn status(&self) -> GpuHealthStatus {
        self.status
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn is_circuit_open(&self) -> bool {
        self.circuit_opened_at.is_some()
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Lifetime failure count of one facet
    pub fn facet_failures(&self, facet: GpuFacet) -> u64 {
        self.facet_failures[facet.index()]
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }
}
