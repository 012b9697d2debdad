//! # Vario Station Library
//!
//! Barometric variometer for gliders and paragliders.
//!
//! This library samples a barometer on a fixed cadence, smooths altitude into
//! a climb rate, streams live readings to connected viewers and records
//! operator-bracketed flight sessions as summary files.

pub mod clock;
pub mod config;
pub mod error;
pub mod flight;
pub mod sensor;
pub mod server;
pub mod telemetry;
