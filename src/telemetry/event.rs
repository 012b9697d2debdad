//! Push events broadcast to every connected viewer.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::reading::SensorReading;

/// One message on the push channel
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Emitted on every successful sampling tick
    SensorData(SensorReading),
    /// A flight session has begun
    FlightStarted,
    /// A flight session has ended
    FlightStopped {
        /// Session length as `H:MM:SS`
        duration: String,
        /// Readings folded into the session statistics
        data_points: u64,
    },
}

impl TelemetryEvent {
    pub fn flight_stopped(duration: TimeDelta, data_points: u64) -> Self {
        TelemetryEvent::FlightStopped {
            duration: format_duration(duration),
            data_points,
        }
    }
}

/// Format a duration as `H:MM:SS`, dropping fractional seconds
///
/// Hours are not wrapped at 24. Negative durations (wall clock stepped back
/// mid-session) are shown as zero.
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
