//! # Flight Recorder
//!
//! Two-state machine bracketing a flight session.
//!
//! ```text
//!            start()                 stop()
//!   Idle ──────────────► Recording ──────────► Idle
//!    ▲  stop(): no-op      │  start(): no-op
//!    └─ fold(): no-op      └─ fold(): update stats
//! ```
//!
//! The recorder is pure state: it takes timestamps from the caller and hands
//! the finished session back instead of persisting or broadcasting anything
//! itself. Serialization against the sampling loop is the owner's job.

use chrono::{DateTime, FixedOffset, TimeDelta};

use crate::telemetry::SensorReading;

/// Running statistics of one session
#[derive(Debug, Clone, PartialEq)]
pub struct FlightStats {
    pub max_altitude: f64,
    pub min_altitude: f64,
    pub max_climb_rate: f64,
    /// Most negative climb rate seen (0.0 if never sinking)
    pub max_sink_rate: f64,
    pub sample_count: u64,
    pub temperature_sum: f64,
}

impl Default for FlightStats {
    fn default() -> Self {
        Self {
            max_altitude: 0.0,
            min_altitude: f64::INFINITY,
            max_climb_rate: 0.0,
            max_sink_rate: 0.0,
            sample_count: 0,
            temperature_sum: 0.0,
        }
    }
}

impl FlightStats {
    /// Fold one reading into the extremes and running sums
    pub fn fold(&mut self, reading: &SensorReading) {
        self.max_altitude = self.max_altitude.max(reading.altitude);
        self.min_altitude = self.min_altitude.min(reading.altitude);
        self.max_climb_rate = self.max_climb_rate.max(reading.climb_rate);
        self.max_sink_rate = self.max_sink_rate.min(reading.climb_rate);
        self.temperature_sum += reading.temperature;
        self.sample_count += 1;
    }

    /// Mean temperature, or 0.0 for an empty session
    pub fn avg_temperature(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.temperature_sum / self.sample_count as f64
        }
    }
}

/// A session handed over by `stop()`
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedFlight {
    pub started_at: DateTime<FixedOffset>,
    pub ended_at: DateTime<FixedOffset>,
    pub stats: FlightStats,
}

impl CompletedFlight {
    pub fn duration(&self) -> TimeDelta {
        self.ended_at - self.started_at
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RecorderState {
    Idle,
    Recording {
        started_at: DateTime<FixedOffset>,
        stats: FlightStats,
    },
}

/// Idle/Recording state machine owning the live statistics
#[derive(Debug, Clone)]
pub struct FlightRecorder {
    state: RecorderState,
}

impl Default for FlightRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightRecorder {
    pub fn new() -> Self {
        Self { state: RecorderState::Idle }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
    }

    /// Start of the active session, if any
    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        match &self.state {
            RecorderState::Recording { started_at, .. } => Some(*started_at),
            RecorderState::Idle => None,
        }
    }

    /// Statistics of the active session, if any
    pub fn stats(&self) -> Option<&FlightStats> {
        match &self.state {
            RecorderState::Recording { stats, .. } => Some(stats),
            RecorderState::Idle => None,
        }
    }

    /// Begin a session with fresh statistics
    ///
    /// Returns `false` (and changes nothing) if a session is already running.
    pub fn start(&mut self, now: DateTime<FixedOffset>) -> bool {
        if self.is_recording() {
            return false;
        }
        self.state = RecorderState::Recording {
            started_at: now,
            stats: FlightStats::default(),
        };
        true
    }

    /// Fold a reading into the active session; no-op while Idle
    pub fn fold(&mut self, reading: &SensorReading) -> bool {
        match &mut self.state {
            RecorderState::Recording { stats, .. } => {
                stats.fold(reading);
                true
            }
            RecorderState::Idle => false,
        }
    }

    /// End the active session and hand it over
    ///
    /// Returns `None` if no session was running.
    pub fn stop(&mut self, now: DateTime<FixedOffset>) -> Option<CompletedFlight> {
        match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Recording { started_at, stats } => Some(CompletedFlight {
                started_at,
                ended_at: now,
                stats,
            }),
            RecorderState::Idle => None,
        }
    }
}
