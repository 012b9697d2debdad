//! # Vario Station
//!
//! Barometric variometer with live viewers and flight session recording.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vario_station::clock::ZoneClock;
use vario_station::config::{Config, LoggingConfig};
use vario_station::flight::FlightArchive;
use vario_station::sensor;
use vario_station::server::ViewerServer;
use vario_station::telemetry::{HubSettings, TelemetryHub};

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "vario-station.log";

/// Set up stdout logging, plus a daily rolling file when enabled
///
/// The returned guard must be held for the file writer to flush.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if config.file_logging {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        None
    }
}

/// Main entry point for Vario Station
///
/// # Control Flow
///
/// 1. Load configuration (first CLI argument, else `config/default.toml`,
///    else built-in defaults) and set up logging
/// 2. Build clock, sensor, archive and telemetry hub
/// 3. Spawn the sampling loop and the viewer endpoint
/// 4. On Ctrl+C, archive any running flight and exit
///
/// # Errors
///
/// Returns error if the configuration is invalid, the archive directory
/// cannot be created or the viewer endpoint cannot bind.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load(DEFAULT_CONFIG_PATH).with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?
        }
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("Vario Station v{} starting...", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path),
        None => info!("Using {} or built-in defaults", DEFAULT_CONFIG_PATH),
    }

    let clock = Arc::new(ZoneClock::new(&config.clock.timezone)?);
    info!("Session clock in {}", clock.timezone());

    let archive = FlightArchive::new(&config.archive.directory);
    archive.ensure_dir()?;
    info!("Flight archive at {}", archive.dir().display());

    let hub = TelemetryHub::new(HubSettings::from_config(&config), clock, archive);
    let source = sensor::open_source(&config.sensor);
    info!("Sensor backend: {:?}", config.sensor.kind);

    let server = ViewerServer::bind(&config.server.bind, hub.clone())
        .await
        .with_context(|| format!("binding viewer endpoint {}", config.server.bind))?;

    let sampler = tokio::spawn(hub.clone().run(source));
    let mut endpoint = tokio::spawn(server.serve());

    info!("Press Ctrl+C to exit");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = &mut endpoint => {
            error!("Viewer endpoint stopped: {:?}", result);
        }
    }

    sampler.abort();
    endpoint.abort();

    if hub.is_recording() {
        warn!("Flight still recording at shutdown, saving it");
        match hub.stop_flight() {
            Ok(Some(summary)) => info!("Saved {} ({} data points)", summary.id, summary.data_points),
            Ok(None) => {}
            Err(e) => error!("Could not save flight at shutdown: {}", e),
        }
    }

    Ok(())
}
