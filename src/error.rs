use std::io;
use thiserror::Error;

/// Error type for the telemetry engine
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required host facility could not be reached at startup.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// One metric read failed this cycle.
    #[error("Sensor read failed: {0}")]
    TransientSensor(String),

    /// A whole sensor class is absent (no driver, no device, circuit open).
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Best-effort release failed. Logged by callers, never propagated.
    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

/// Result type alias for the telemetry engine
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create an initialization error
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        MonitorError::Initialization(msg.into())
    }

    pub fn transient_sensor<S: Into<String>>(msg: S) -> Self {
        MonitorError::TransientSensor(msg.into())
    }

    pub fn sensor_unavailable<S: Into<String>>(msg: S) -> Self {
        MonitorError::SensorUnavailable(msg.into())
    }

    pub fn shutdown<S: Into<String>>(msg: S) -> Self {
        MonitorError::Shutdown(msg.into())
    }

    /// True for failures that only degrade the current cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, MonitorError::TransientSensor(_))
    }
}
