//! # Telemetry Hub
//!
//! Orchestrates the sampling loop and fans readings out to viewers.
//!
//! ## Shared State
//!
//! The latest reading, the climb rate window and the flight recorder live in
//! one `HubState` behind a single mutex. A tick holds the lock while it
//! stores the reading and folds it into the session, and `start`/`stop` hold
//! it for the state transition, so a fold never observes a half-finished
//! transition and a stopped session never receives a late reading.
//!
//! Broadcasting happens after the lock is released and never waits for
//! subscribers: a slow viewer only lags its own receiver.
//!
//! ## Tick
//!
//! ```text
//! read (bounded by timeout) ─► validate ─► smooth ─► stamp
//!        │ fail                                       │
//!        ▼                                            ▼
//!   log, skip tick                 store latest, fold if recording
//!                                                     │
//!                                                     ▼
//!                                         broadcast `sensor_data`
//! ```

use chrono::TimeDelta;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::climb::ClimbRateEstimator;
use super::event::{format_duration, TelemetryEvent};
use super::reading::SensorReading;
use crate::clock::SessionClock;
use crate::config::Config;
use crate::error::{Result, VarioError};
use crate::flight::{FlightArchive, FlightRecorder, RecordId};
use crate::sensor::{RawSample, SensorSource};

/// Ticks between two status log lines
const STATUS_LOG_TICKS: u64 = 150;

/// Sampling loop tuning
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Delay between ticks
    pub interval: Duration,
    /// Upper bound on one sensor read
    pub read_timeout: Duration,
    /// Altitude samples kept by the climb rate estimator
    pub climb_window: usize,
    /// Sample spacing the estimator divides by, in seconds
    pub climb_interval_secs: f64,
    /// Events buffered per subscriber before it starts lagging
    pub channel_capacity: usize,
}

impl HubSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.sampling.interval(),
            read_timeout: config.sensor.read_timeout(),
            climb_window: config.sampling.climb_window,
            climb_interval_secs: config.sampling.climb_interval_secs(),
            channel_capacity: config.server.channel_capacity,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of a stopped and archived session
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSummary {
    pub id: RecordId,
    pub duration: TimeDelta,
    pub data_points: u64,
}

struct HubState {
    latest: Option<SensorReading>,
    estimator: ClimbRateEstimator,
    recorder: FlightRecorder,
}

struct HubInner {
    state: Mutex<HubState>,
    events: broadcast::Sender<TelemetryEvent>,
    clock: Arc<dyn SessionClock>,
    archive: FlightArchive,
    settings: HubSettings,
}

/// Cheaply clonable handle to the telemetry pipeline
#[derive(Clone)]
pub struct TelemetryHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for TelemetryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHub")
            .field("settings", &self.inner.settings)
            .field("archive", &self.inner.archive.dir())
            .finish_non_exhaustive()
    }
}

impl TelemetryHub {
    pub fn new(settings: HubSettings, clock: Arc<dyn SessionClock>, archive: FlightArchive) -> Self {
        let (events, _) = broadcast::channel(settings.channel_capacity.max(1));
        let state = HubState {
            latest: None,
            estimator: ClimbRateEstimator::with_window(settings.climb_interval_secs, settings.climb_window),
            recorder: FlightRecorder::new(),
        };

        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(state),
                events,
                clock,
                archive,
                settings,
            }),
        }
    }

    /// Receive every event broadcast from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.inner.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    /// Most recent reading, `None` before the first successful tick
    pub fn latest(&self) -> Option<SensorReading> {
        self.inner.state.lock().latest.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.inner.state.lock().recorder.is_recording()
    }

    pub fn archive(&self) -> &FlightArchive {
        &self.inner.archive
    }

    pub fn settings(&self) -> &HubSettings {
        &self.inner.settings
    }

    fn broadcast(&self, event: TelemetryEvent) {
        // Err only means nobody is listening
        let _ = self.inner.events.send(event);
    }

    /// Run one sampling tick against `source`
    ///
    /// # Errors
    ///
    /// Returns a sensor fault (`Sensor`, `SensorTimeout`, `ImplausibleReading`)
    /// if the read failed; nothing is stored, folded or broadcast in that case.
    pub async fn tick(&self, source: &mut dyn SensorSource) -> Result<SensorReading> {
        let read_timeout = self.inner.settings.read_timeout;
        let sample = match timeout(read_timeout, source.read()).await {
            Ok(result) => result?,
            Err(_) => return Err(VarioError::SensorTimeout(read_timeout.as_millis() as u64)),
        };
        self.ingest(sample)
    }

    /// Validate, smooth, stamp, store, fold and broadcast one raw sample
    ///
    /// # Errors
    ///
    /// Returns `ImplausibleReading` for NaN or out-of-range samples, leaving
    /// the climb rate window untouched.
    pub fn ingest(&self, sample: RawSample) -> Result<SensorReading> {
        sample.validate()?;
        let timestamp = self.inner.clock.now();

        let reading = {
            let mut state = self.inner.state.lock();
            let climb_rate = state.estimator.observe(sample.altitude);
            let reading = SensorReading::from_sample(&sample, climb_rate, timestamp);

            state.latest = Some(reading.clone());
            state.recorder.fold(&reading);
            reading
        };

        self.broadcast(TelemetryEvent::SensorData(reading.clone()));
        Ok(reading)
    }

    /// Begin a flight session
    ///
    /// Returns `false` if a session is already running; duplicate start
    /// commands are harmless.
    pub fn start_flight(&self) -> bool {
        let now = self.inner.clock.now();
        let started = self.inner.state.lock().recorder.start(now);

        if started {
            info!("Flight started at {}", now.to_rfc3339());
            self.broadcast(TelemetryEvent::FlightStarted);
        } else {
            debug!("Start ignored, flight already in progress");
        }
        started
    }

    /// End the flight session and archive it
    ///
    /// Returns `Ok(None)` if no session was running.
    ///
    /// # Errors
    ///
    /// Returns the archive error if the record could not be written. The
    /// session's statistics are lost in that case, but the hub is already
    /// Idle and `flight_stopped` is still broadcast.
    pub fn stop_flight(&self) -> Result<Option<FlightSummary>> {
        let now = self.inner.clock.now();
        let stopped = self.inner.state.lock().recorder.stop(now);
        let Some(flight) = stopped else {
            debug!("Stop ignored, no flight in progress");
            return Ok(None);
        };

        let duration = flight.duration();
        let data_points = flight.stats.sample_count;
        let saved = self.inner.archive.save(&flight);

        info!(
            "Flight stopped. Duration: {}, Data points: {}",
            format_duration(duration),
            data_points
        );
        self.broadcast(TelemetryEvent::flight_stopped(duration, data_points));

        match saved {
            Ok(id) => Ok(Some(FlightSummary { id, duration, data_points })),
            Err(e) => {
                error!("Flight data lost, archive write failed: {}", e);
                Err(e)
            }
        }
    }

    /// Sample `source` forever on the configured cadence
    ///
    /// A failed tick is logged and skipped; the loop never exits on its own.
    pub async fn run(self, mut source: Box<dyn SensorSource>) {
        let mut ticker = interval(self.inner.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Sampling every {} ms (read timeout {} ms)",
            self.inner.settings.interval.as_millis(),
            self.inner.settings.read_timeout.as_millis()
        );

        let mut ticks: u64 = 0;
        let mut skipped: u64 = 0;

        loop {
            ticker.tick().await;
            ticks += 1;

            match self.tick(source.as_mut()).await {
                Ok(reading) => {
                    debug!(
                        "Tick {}: {:.1} m, {:+.1} m/s, {:.1} hPa, {:.1} °C",
                        ticks, reading.altitude, reading.climb_rate, reading.pressure, reading.temperature
                    );
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Sensor error, skipping tick {}: {}", ticks, e);
                }
            }

            if ticks % STATUS_LOG_TICKS == 0 {
                info!(
                    "Sampled {} ticks ({} skipped), {} viewer(s) connected",
                    ticks,
                    skipped,
                    self.subscriber_count()
                );
            }
        }
    }
}
