use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::system_monitor::AlertThresholds;
use crate::error::{MonitorError, Result};

const CONFIG_FILE: &str = "profiles.json";

pub const MIN_REFRESH_MS: u64 = 250;
pub const MAX_REFRESH_MS: u64 = 5000;
pub const MIN_PROCESSES: usize = 10;
pub const MAX_PROCESSES: usize = 1000;
pub const MIN_HISTORY: usize = 10;
pub const MAX_HISTORY: usize = 500;

/// Settings handed to the telemetry core at construction
///
/// Keys match the dashboard's `profiles.json`; renderer-only keys such as the
/// theme or column widths are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Milliseconds between samples
    pub refresh_interval: u64,
    /// Processes scanned per cycle
    pub max_processes: usize,
    /// Points kept for the GPU utilization graph
    pub gpu_history_length: usize,
    pub alert_thresholds: AlertThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 1000,
            max_processes: 200,
            gpu_history_length: 100,
            alert_thresholds: AlertThresholds::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: MonitorConfig = serde_json::from_str(&data)
            .map_err(|e| MonitorError::config(format!("{:?}: {}", path, e)))?;
        config.validate();
        Ok(config)
    }

    /// `./profiles.json` if present, else the per-user config directory
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("omnitop").join(CONFIG_FILE))
            .unwrap_or(local)
    }

    /// Clamp every value into its supported range
    pub fn validate(&mut self) {
        self.refresh_interval = self.refresh_interval.clamp(MIN_REFRESH_MS, MAX_REFRESH_MS);
        self.max_processes = self.max_processes.clamp(MIN_PROCESSES, MAX_PROCESSES);
        self.gpu_history_length = self.gpu_history_length.clamp(MIN_HISTORY, MAX_HISTORY);

        let t = &mut self.alert_thresholds;
        t.cpu_usage_percent = t.cpu_usage_percent.clamp(0.0, 100.0);
        t.gpu_usage_percent = t.gpu_usage_percent.clamp(0.0, 100.0);
        t.memory_usage_percent = t.memory_usage_percent.clamp(0.0, 100.0);
        t.cpu_temp_celsius = t.cpu_temp_celsius.clamp(0.0, 150.0);
        t.gpu_temp_celsius = t.gpu_temp_celsius.clamp(0.0, 150.0);
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }
}
