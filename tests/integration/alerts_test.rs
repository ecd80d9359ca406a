use std::sync::Mutex;
use std::time::{Duration, Instant};

use omnitop::core::system_monitor::{
    AlertEvaluator, AlertKind, AlertThresholds, GpuFacet, NotificationRequest, NotificationSink,
    Sampler, SyntheticGpuDriver, SyntheticHost, Urgency,
};
use omnitop::MonitorConfig;

use super::support::{ScriptedGpu, ScriptedHost};

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl NotificationSink for RecordingSink {
    fn dispatch(&self, request: NotificationRequest) {
        self.sent.lock().unwrap().push(request);
    }
}

#[test]
fn test_hot_host_notifies_once_per_window() {
    let host = ScriptedHost::new(2);
    host.with(|s| s.cpu_usage = 97.0);
    let gpu = ScriptedGpu::new();
    let mut provider = Sampler::new(host.clone(), gpu.driver(), &MonitorConfig::default());
    let mut alerts = AlertEvaluator::new(AlertThresholds::default());
    let t0 = Instant::now();

    let first = alerts.evaluate_at(&provider.sample_at(t0), t0);
    let kinds: Vec<AlertKind> = first.conditions.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AlertKind::CpuUsage,
            AlertKind::CpuCoreUsage(0),
            AlertKind::CpuCoreUsage(1)
        ]
    );

    let request = first.notification.unwrap();
    assert_eq!(request.title, "OmniTop Alert");
    assert_eq!(request.message, "Alert: CPU Load 97% (+2 more)");
    assert_eq!(request.urgency, Urgency::Critical);

    let t1 = t0 + Duration::from_secs(3);
    let second = alerts.evaluate_at(&provider.sample_at(t1), t1);
    assert_eq!(second.conditions.len(), 3);
    assert!(second.notification.is_none());

    let t2 = t0 + Duration::from_secs(11);
    assert!(alerts
        .evaluate_at(&provider.sample_at(t2), t2)
        .notification
        .is_some());
}

#[test]
fn test_failed_gpu_is_not_evaluated() {
    let host = ScriptedHost::new(1);
    let gpu = ScriptedGpu::new();
    gpu.with(|s| s.failing.extend(GpuFacet::ALL));
    let mut provider = Sampler::new(host, gpu.driver(), &MonitorConfig::default());

    let thresholds = AlertThresholds {
        gpu_usage_percent: 0.0,
        gpu_temp_celsius: 0.0,
        ..Default::default()
    };
    let mut alerts = AlertEvaluator::new(thresholds);
    let outcome = alerts.evaluate(&provider.sample_at(Instant::now()));
    assert!(outcome.conditions.is_empty());
}

#[test]
fn test_synthetic_gpu_triggers_with_low_thresholds() {
    let mut provider = Sampler::new(
        SyntheticHost::with_seed(3),
        Box::new(SyntheticGpuDriver::with_seed(3)),
        &MonitorConfig::default(),
    );
    let thresholds = AlertThresholds {
        cpu_usage_percent: 100.0,
        cpu_temp_celsius: 150.0,
        gpu_usage_percent: 10.0,
        gpu_temp_celsius: 150.0,
        memory_usage_percent: 100.0,
    };
    let sink = RecordingSink::default();
    let mut alerts = AlertEvaluator::new(thresholds);

    let conditions = alerts.evaluate_and_dispatch(&provider.sample_at(Instant::now()), &sink);
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].kind, AlertKind::GpuUsage);

    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.starts_with("Alert: GPU Util "));
}
