//! # Sensor Module
//!
//! Barometric sensor abstraction feeding the telemetry hub.
//!
//! This module handles:
//! - The `SensorSource` trait the sampling loop pulls from
//! - Plausibility checks on raw samples
//! - Pressure to altitude conversion
//! - Linux IIO and simulated backends

pub mod iio;
pub mod simulated;

use async_trait::async_trait;

use crate::config::{SensorConfig, SensorKind};
use crate::error::{Result, VarioError};

pub use iio::IioBarometer;
pub use simulated::SimulatedBarometer;

/// Pressure range (hPa) a BMP3xx can physically report
const PRESSURE_RANGE_HPA: std::ops::RangeInclusive<f64> = 300.0..=1100.0;

/// Operating temperature range (°C) of the sensor
const TEMPERATURE_RANGE_C: std::ops::RangeInclusive<f64> = -40.0..=85.0;

/// One raw barometer sample, before smoothing and rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Temperature in °C
    pub temperature: f64,
    /// Static pressure in hPa
    pub pressure: f64,
    /// Pressure altitude in meters
    pub altitude: f64,
}

impl RawSample {
    /// Reject NaN, infinities and values outside the sensor's range
    ///
    /// # Errors
    ///
    /// Returns `ImplausibleReading` describing the offending field
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("altitude", self.altitude),
        ] {
            if !value.is_finite() {
                return Err(VarioError::ImplausibleReading(format!("{} is {}", name, value)));
            }
        }

        if !PRESSURE_RANGE_HPA.contains(&self.pressure) {
            return Err(VarioError::ImplausibleReading(format!(
                "pressure {:.1} hPa out of range",
                self.pressure
            )));
        }

        if !TEMPERATURE_RANGE_C.contains(&self.temperature) {
            return Err(VarioError::ImplausibleReading(format!(
                "temperature {:.1} °C out of range",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// Anything that can produce a barometer sample on demand
///
/// The hub supplies the cadence; implementations only answer single reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorSource: Send {
    /// Take one reading
    async fn read(&mut self) -> Result<RawSample>;
}

/// Convert static pressure to altitude with the international barometric formula
///
/// # Arguments
///
/// * `pressure_hpa` - Measured static pressure
/// * `sea_level_hpa` - Reference pressure at 0 m (QNH)
pub fn pressure_to_altitude(pressure_hpa: f64, sea_level_hpa: f64) -> f64 {
    44307.7 * (1.0 - (pressure_hpa / sea_level_hpa).powf(0.190284))
}

/// Build the sensor backend selected in the configuration
pub fn open_source(config: &SensorConfig) -> Box<dyn SensorSource> {
    match config.kind {
        SensorKind::Iio => Box::new(IioBarometer::new(&config.iio_device, config.sea_level_pressure_hpa)),
        SensorKind::Simulated => Box::new(SimulatedBarometer::new(config.sea_level_pressure_hpa)),
    }
}
