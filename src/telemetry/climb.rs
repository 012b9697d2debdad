//! # Climb Rate Estimator
//!
//! First-difference smoother over a short trailing altitude window.
//!
//! The newest altitude is compared with the *oldest* one still in the window,
//! not with its immediate predecessor:
//!
//! `climb_rate = (newest - oldest) / (sample_interval * (len - 1))`
//!
//! A 5-sample window therefore averages the vertical speed over the last four
//! sample intervals, trading responsiveness for noise rejection.
//!
//! ```
//! use vario_station::telemetry::climb::ClimbRateEstimator;
//!
//! let mut vario = ClimbRateEstimator::new(0.5);
//! assert_eq!(vario.observe(100.0), 0.0);
//! assert_eq!(vario.observe(102.0), 4.0);
//! ```

use std::collections::VecDeque;

use super::reading::round1;

/// Number of altitude samples kept for smoothing
pub const DEFAULT_WINDOW: usize = 5;

/// Rolling-window vertical speed estimator
#[derive(Debug, Clone)]
pub struct ClimbRateEstimator {
    window: VecDeque<f64>,
    capacity: usize,
    sample_interval_secs: f64,
}

impl ClimbRateEstimator {
    /// Estimator with the default 5-sample window
    ///
    /// # Arguments
    ///
    /// * `sample_interval_secs` - Time between two consecutive observations
    pub fn new(sample_interval_secs: f64) -> Self {
        Self::with_window(sample_interval_secs, DEFAULT_WINDOW)
    }

    /// Estimator with a custom window length (at least 2)
    pub fn with_window(sample_interval_secs: f64, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            sample_interval_secs,
        }
    }

    /// Push an altitude and return the smoothed climb rate in m/s (1 decimal)
    ///
    /// Returns 0.0 until two samples are available.
    pub fn observe(&mut self, altitude: f64) -> f64 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(altitude);

        let len = self.window.len();
        if len < 2 {
            return 0.0;
        }
        let oldest = self.window[0];
        let newest = self.window[len - 1];

        let elapsed = self.sample_interval_secs * (len - 1) as f64;
        if elapsed == 0.0 {
            return 0.0;
        }

        round1((newest - oldest) / elapsed)
    }

    /// Altitudes currently in the window, oldest first
    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
