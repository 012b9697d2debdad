//! Composed per-tick reading shared with viewers and the flight recorder.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::sensor::RawSample;

/// Round to one decimal place, the resolution of every published value
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Smoothed, timestamped reading produced by one sampling tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// °C, 1 decimal
    pub temperature: f64,
    /// hPa, 1 decimal
    pub pressure: f64,
    /// m, 1 decimal
    pub altitude: f64,
    /// m/s, 1 decimal, positive when ascending
    pub climb_rate: f64,
    /// Civil time of the tick in the configured zone (ISO-8601 on the wire)
    pub timestamp: DateTime<FixedOffset>,
}

impl SensorReading {
    /// Compose a reading from a raw sample and an already smoothed climb rate
    pub fn from_sample(sample: &RawSample, climb_rate: f64, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            temperature: round1(sample.temperature),
            pressure: round1(sample.pressure),
            altitude: round1(sample.altitude),
            climb_rate: round1(climb_rate),
            timestamp,
        }
    }
}
