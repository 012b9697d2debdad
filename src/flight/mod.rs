//! # Flight Module
//!
//! Flight session bracketing and persistence.
//!
//! This module handles:
//! - The Idle/Recording state machine and its running statistics
//! - Turning a finished session into a `FlightRecord`
//! - Storing, listing, loading and deleting records on disk

pub mod archive;
pub mod recorder;

pub use archive::{FlightArchive, FlightRecord, RecordId};
pub use recorder::{CompletedFlight, FlightRecorder, FlightStats};
