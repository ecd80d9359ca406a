use std::fs;

use omnitop::core::config::{MAX_REFRESH_MS, MIN_PROCESSES};
use omnitop::{MonitorConfig, MonitorError};
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = MonitorConfig::default();
    assert_eq!(config.refresh_interval, 1000);
    assert_eq!(config.max_processes, 200);
    assert_eq!(config.gpu_history_length, 100);
    assert_eq!(config.alert_thresholds.cpu_usage_percent, 90.0);
    assert_eq!(config.alert_thresholds.gpu_usage_percent, 95.0);
}

#[test]
fn test_config_load_nonexistent_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = MonitorConfig::load(&temp_dir.path().join("profiles.json")).unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_config_load_clamps_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("profiles.json");
    fs::write(
        &path,
        r#"{
            "refreshInterval": 60000,
            "maxProcesses": 1,
            "theme": "matrix",
            "alertThresholds": { "cpuUsagePercent": 75.0, "gpuTempCelsius": 70.0 }
        }"#,
    )
    .unwrap();

    let config = MonitorConfig::load(&path).unwrap();
    assert_eq!(config.refresh_interval, MAX_REFRESH_MS);
    assert_eq!(config.max_processes, MIN_PROCESSES);
    assert_eq!(config.gpu_history_length, 100);
    assert_eq!(config.alert_thresholds.cpu_usage_percent, 75.0);
    assert_eq!(config.alert_thresholds.gpu_temp_celsius, 70.0);
    assert_eq!(config.alert_thresholds.memory_usage_percent, 90.0);
}

#[test]
fn test_config_load_rejects_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("profiles.json");
    fs::write(&path, "{ refreshInterval: ").unwrap();

    match MonitorConfig::load(&path) {
        Err(MonitorError::Config(msg)) => assert!(msg.contains("profiles.json")),
        other => panic!("expected a config error, got {:?}", other),
    }
}

#[test]
fn test_config_roundtrip_uses_camel_case() {
    let json = serde_json::to_string(&MonitorConfig::default()).unwrap();
    assert!(json.contains("\"refreshInterval\":1000"));
    assert!(json.contains("\"gpuHistoryLength\":100"));
}
