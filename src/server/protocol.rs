//! # Viewer Protocol
//!
//! Newline-delimited JSON spoken between the station and its viewers.
//!
//! ## Requests (viewer → station)
//!
//! | `type` | Fields | Effect |
//! |--------|--------|--------|
//! | `start_flight` | | Begin a session |
//! | `stop_flight` | | End and archive the session |
//! | `get_current` | | Latest reading |
//! | `list_flights` | | Stored record ids |
//! | `get_flight` | `id` | One stored record |
//! | `delete_flight` | `id` | Remove a stored record |
//!
//! ## Responses (station → viewer)
//!
//! Tagged by `response`; interleaved with pushed `event` messages
//! (see [`TelemetryEvent`](crate::telemetry::TelemetryEvent)).

use serde::{Deserialize, Serialize};

use crate::flight::{FlightRecord, RecordId};
use crate::telemetry::SensorReading;

/// A command or query sent by a viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    StartFlight,
    StopFlight,
    GetCurrent,
    ListFlights,
    GetFlight { id: String },
    DeleteFlight { id: String },
}

/// The station's answer to one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    /// Command accepted (including duplicate start/stop)
    Ack,
    /// Latest reading; `null` before the first tick
    Current { reading: Option<SensorReading> },
    Flights { ids: Vec<RecordId> },
    Flight { record: FlightRecord },
    Deleted { success: bool },
    NotFound { id: String },
    Error { message: String },
}
