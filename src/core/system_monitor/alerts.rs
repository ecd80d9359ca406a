//! Alert system for monitoring critical conditions.
//!
//! Evaluates a snapshot against thresholds in a fixed order and, at most once
//! per rate-limit window, asks a delivery sink to show a notification.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::metrics::Snapshot;

pub const DEFAULT_ALERT_WINDOW: Duration = Duration::from_secs(10);
pub const ALERT_TITLE: &str = "OmniTop Alert";

/// Alert thresholds; a value strictly above its threshold fires
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertThresholds {
    pub cpu_usage_percent: f64,
    pub cpu_temp_celsius: f64,
    pub gpu_usage_percent: f64,
    pub gpu_temp_celsius: f64,
    pub memory_usage_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_usage_percent: 90.0,
            cpu_temp_celsius: 85.0,
            gpu_usage_percent: 95.0,
            gpu_temp_celsius: 85.0,
            memory_usage_percent: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    CpuUsage,
    CpuCoreUsage(usize),
    CpuCoreTemperature(usize),
    GpuUsage,
    GpuTemperature,
    MemoryUsage,
}

/// One triggered condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub label: String,
    pub value: f64,
    pub threshold: f64,
}

impl AlertCondition {
    /// Short human form, e.g. `CPU Load 95%`
    pub fn describe(&self) -> String {
        let unit = match self.kind {
            AlertKind::CpuCoreTemperature(_) | AlertKind::GpuTemperature => "C",
            _ => "%",
        };
        format!("{} {:.0}{}", self.label, self.value, unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// A request for the external delivery collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
}

/// Delivers notification requests; must not block the sampling loop
pub trait NotificationSink {
    fn dispatch(&self, request: NotificationRequest);
}

/// Evaluate every threshold in fixed order, collecting each breach
pub fn evaluate_alerts(snapshot: &Snapshot, thresholds: &AlertThresholds) -> Vec<AlertCondition> {
    let mut conditions = Vec::new();
    let mut check = |kind: AlertKind, label: String, value: f64, threshold: f64| {
        if value > threshold {
            conditions.push(AlertCondition {
                kind,
                label,
                value,
                threshold,
            });
        }
    };

    let cpu = &snapshot.cpu;
    check(
        AlertKind::CpuUsage,
        "CPU Load".to_string(),
        cpu.global_usage_percent,
        thresholds.cpu_usage_percent,
    );

    for (i, &usage) in cpu.per_core_usage.iter().enumerate() {
        check(
            AlertKind::CpuCoreUsage(i),
            format!("CPU Core {}", i),
            usage,
            thresholds.cpu_usage_percent,
        );
    }

    for (i, &temp) in cpu.per_core_temp.iter().enumerate() {
        check(
            AlertKind::CpuCoreTemperature(i),
            format!("CPU Temp {}", i),
            temp,
            thresholds.cpu_temp_celsius,
        );
    }

    if snapshot.gpu.available {
        check(
            AlertKind::GpuUsage,
            "GPU Util".to_string(),
            snapshot.gpu.utilization_percent as f64,
            thresholds.gpu_usage_percent,
        );
        check(
            AlertKind::GpuTemperature,
            "GPU Temp".to_string(),
            snapshot.gpu.temperature_celsius as f64,
            thresholds.gpu_temp_celsius,
        );
    }

    check(
        AlertKind::MemoryUsage,
        "Mem".to_string(),
        snapshot.memory.used_percent,
        thresholds.memory_usage_percent,
    );

    conditions
}

/// Result of one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertOutcome {
    pub conditions: Vec<AlertCondition>,
    pub notification: Option<NotificationRequest>,
}

/// Threshold evaluation plus notification rate limiting
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
    window: Duration,
    last_dispatch: Option<Instant>,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self::with_window(thresholds, DEFAULT_ALERT_WINDOW)
    }

    pub fn with_window(thresholds: AlertThresholds, window: Duration) -> Self {
        Self {
            thresholds,
            window,
            last_dispatch: None,
        }
    }

    pub fn evaluate(&mut self, snapshot: &Snapshot) -> AlertOutcome {
        self.evaluate_at(snapshot, Instant::now())
    }

    pub fn evaluate_at(&mut self, snapshot: &Snapshot, now: Instant) -> AlertOutcome {
        let conditions = evaluate_alerts(snapshot, &self.thresholds);
        let notification = if conditions.is_empty() || !self.window_open(now) {
            None
        } else {
            self.last_dispatch = Some(now);
            Some(build_notification(&conditions))
        };

        AlertOutcome {
            conditions,
            notification,
        }
    }

    /// Evaluate and hand any notification to `sink`
    pub fn evaluate_and_dispatch<S: NotificationSink + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        sink: &S,
    ) -> Vec<AlertCondition> {
        let outcome = self.evaluate(snapshot);
        if let Some(request) = outcome.notification {
            sink.dispatch(request);
        }
        outcome.conditions
    }

    fn window_open(&self, now: Instant) -> bool {
        match self.last_dispatch {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.window,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }
}

fn build_notification(conditions: &[AlertCondition]) -> NotificationRequest {
    let mut message = format!("Alert: {}", conditions[0].describe());
    if conditions.len() > 1 {
        message.push_str(&format!(" (+{} more)", conditions.len() - 1));
    }

    NotificationRequest {
        title: ALERT_TITLE.to_string(),
        message,
        urgency: Urgency::Critical,
    }
}
