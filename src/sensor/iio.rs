//! # Linux IIO Barometer
//!
//! Reads a BMP3xx/BMP280 through the kernel's Industrial I/O sysfs interface.
//!
//! ## Channels
//!
//! | File | Unit |
//! |------|------|
//! | `in_pressure_input` | kPa |
//! | `in_temp_input` | m°C |

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{pressure_to_altitude, RawSample, SensorSource};
use crate::error::{Result, VarioError};

const PRESSURE_CHANNEL: &str = "in_pressure_input";
const TEMPERATURE_CHANNEL: &str = "in_temp_input";

/// Barometer exposed as an IIO device directory
#[derive(Debug, Clone)]
pub struct IioBarometer {
    device_dir: PathBuf,
    sea_level_hpa: f64,
}

impl IioBarometer {
    /// # Arguments
    ///
    /// * `device_dir` - e.g. `/sys/bus/iio/devices/iio:device0`
    /// * `sea_level_hpa` - Reference pressure for the altitude conversion
    pub fn new<P: AsRef<Path>>(device_dir: P, sea_level_hpa: f64) -> Self {
        Self {
            device_dir: device_dir.as_ref().to_path_buf(),
            sea_level_hpa,
        }
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    async fn read_channel(&self, channel: &str) -> Result<f64> {
        let path = self.device_dir.join(channel);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| VarioError::Sensor(format!("Failed to read {}: {}", path.display(), e)))?;

        raw.trim()
            .parse::<f64>()
            .map_err(|e| VarioError::Sensor(format!("Bad value '{}' in {}: {}", raw.trim(), path.display(), e)))
    }
}

#[async_trait]
impl SensorSource for IioBarometer {
    async fn read(&mut self) -> Result<RawSample> {
        let pressure_kpa = self.read_channel(PRESSURE_CHANNEL).await?;
        let temp_millic = self.read_channel(TEMPERATURE_CHANNEL).await?;

        let pressure = pressure_kpa * 10.0;
        let temperature = temp_millic / 1000.0;
        let altitude = pressure_to_altitude(pressure, self.sea_level_hpa);

        debug!("IIO sample: {:.2} hPa, {:.2} °C, {:.2} m", pressure, temperature, altitude);

        Ok(RawSample { temperature, pressure, altitude })
    }
}
