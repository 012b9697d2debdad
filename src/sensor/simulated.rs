//! # Simulated Barometer
//!
//! Deterministic stand-in for bench testing without hardware: the altitude
//! follows a slow climb-and-glide cycle, and pressure is derived from it by
//! inverting the barometric formula.

use async_trait::async_trait;

use super::{RawSample, SensorSource};
use crate::error::Result;

/// Altitude of the launch site in meters
const BASE_ALTITUDE_M: f64 = 350.0;

/// Samples per climb/glide cycle
const CYCLE_SAMPLES: u64 = 120;

/// Altitude gained over the climbing half of a cycle
const CYCLE_GAIN_M: f64 = 240.0;

/// Temperature lapse rate of the standard atmosphere (°C per meter)
const LAPSE_RATE: f64 = 0.0065;

/// Synthetic sensor producing a repeating thermal profile
#[derive(Debug, Clone)]
pub struct SimulatedBarometer {
    sea_level_hpa: f64,
    tick: u64,
}

impl SimulatedBarometer {
    pub fn new(sea_level_hpa: f64) -> Self {
        Self { sea_level_hpa, tick: 0 }
    }

    fn altitude_at(tick: u64) -> f64 {
        let phase = tick % CYCLE_SAMPLES;
        let half = CYCLE_SAMPLES / 2;
        let progress = if phase < half {
            phase as f64 / half as f64
        } else {
            (CYCLE_SAMPLES - phase) as f64 / half as f64
        };
        BASE_ALTITUDE_M + CYCLE_GAIN_M * progress
    }
}

#[async_trait]
impl SensorSource for SimulatedBarometer {
    async fn read(&mut self) -> Result<RawSample> {
        let altitude = Self::altitude_at(self.tick);
        self.tick = self.tick.wrapping_add(1);

        let pressure = self.sea_level_hpa * (1.0 - altitude / 44307.7).powf(1.0 / 0.190284);
        let temperature = 15.0 - LAPSE_RATE * altitude;

        Ok(RawSample { temperature, pressure, altitude })
    }
}
