//! # Telemetry Module
//!
//! Real-time sampling pipeline.
//!
//! This module handles:
//! - Pulling raw samples from the barometer on a fixed cadence
//! - Smoothing altitude into a climb rate
//! - Keeping the latest reading for on-demand queries
//! - Feeding the flight recorder while a session is active
//! - Broadcasting readings and session events to viewers

pub mod climb;
pub mod event;
pub mod hub;
pub mod reading;

pub use climb::ClimbRateEstimator;
pub use event::{format_duration, TelemetryEvent};
pub use hub::{FlightSummary, HubSettings, TelemetryHub};
pub use reading::{round1, SensorReading};
