//! # Error Types
//!
//! Custom error types for Vario Station using `thiserror`.

use thiserror::Error;

/// Main error type for Vario Station
#[derive(Debug, Error)]
pub enum VarioError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sensor read failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Sensor read did not complete in time
    #[error("Sensor read timed out after {0} ms")]
    SensorTimeout(u64),

    /// Sensor returned a value outside the physically plausible range
    #[error("Implausible sensor reading: {0}")]
    ImplausibleReading(String),

    /// Flight archive could not be written, read or deleted
    #[error("Storage error: {0}")]
    Storage(String),

    /// Flight record does not exist
    #[error("Flight record not found: {0}")]
    NotFound(String),

    /// Flight record identifier is malformed
    #[error("Invalid flight record id: {0}")]
    InvalidRecordId(String),

    /// Unknown IANA timezone name
    #[error("Unknown timezone: {0}")]
    Timezone(String),
}

impl VarioError {
    /// True for failures that only cost a single sampling tick.
    pub fn is_sensor_fault(&self) -> bool {
        matches!(
            self,
            VarioError::Sensor(_) | VarioError::SensorTimeout(_) | VarioError::ImplausibleReading(_)
        )
    }
}

/// Result type alias for Vario Station
pub type Result<T> = std::result::Result<T, VarioError>;
