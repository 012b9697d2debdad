//! # Flight Archive
//!
//! Durable storage of completed sessions, one pretty-printed JSON file each.
//!
//! ## Naming
//!
//! A record is identified by its start time in the configured civil zone:
//!
//! ```text
//! <archive dir>/flight_20240714_130502.json
//!               └──── RecordId ───────┘
//! ```
//!
//! Ids are validated before they are turned into paths, so a request can
//! never reach outside the archive directory.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::recorder::CompletedFlight;
use crate::error::{Result, VarioError};
use crate::telemetry::round1;

const RECORD_PREFIX: &str = "flight_";
const RECORD_EXTENSION: &str = "json";
const RECORD_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identity of a stored flight, derived from its civil start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId {
    started: NaiveDateTime,
}

impl RecordId {
    /// Id for a session that started at `start`, truncated to whole seconds
    pub fn from_start(start: &DateTime<FixedOffset>) -> Self {
        let local = start.naive_local();
        Self {
            started: local.with_nanosecond(0).unwrap_or(local),
        }
    }

    /// Civil date and time encoded in the id
    pub fn started(&self) -> NaiveDateTime {
        self.started
    }

    /// File name inside the archive directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self, RECORD_EXTENSION)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", RECORD_PREFIX, self.started.format(RECORD_TIME_FORMAT))
    }
}

impl FromStr for RecordId {
    type Err = VarioError;

    /// Accepts `flight_YYYYMMDD_HHMMSS`, with or without the `.json` suffix
    fn from_str(s: &str) -> Result<Self> {
        let stem = s.strip_suffix(".json").unwrap_or(s);

        let stamp = stem
            .strip_prefix(RECORD_PREFIX)
            .ok_or_else(|| VarioError::InvalidRecordId(s.to_string()))?;

        // "%Y" alone would also accept signs and longer years
        let well_formed = stamp.len() == 15
            && stamp.bytes().enumerate().all(|(i, b)| match i {
                8 => b == b'_',
                _ => b.is_ascii_digit(),
            });
        if !well_formed {
            return Err(VarioError::InvalidRecordId(s.to_string()));
        }

        let started = NaiveDateTime::parse_from_str(stamp, RECORD_TIME_FORMAT)
            .map_err(|_| VarioError::InvalidRecordId(s.to_string()))?;

        Ok(Self { started })
    }
}

impl TryFrom<String> for RecordId {
    type Error = VarioError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

/// Persisted summary of one completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub duration_seconds: f64,
    pub max_altitude: f64,
    pub min_altitude: f64,
    pub max_climb_rate: f64,
    pub max_sink_rate: f64,
    pub altitude_gain: f64,
    pub avg_temperature: f64,
    pub data_points: u64,
}

impl FlightRecord {
    /// Summarize a finished session, rounding statistics to 1 decimal
    ///
    /// An empty session stores a zero minimum altitude instead of +∞.
    pub fn from_flight(flight: &CompletedFlight) -> Self {
        let stats = &flight.stats;
        let min_altitude = if stats.sample_count == 0 {
            stats.max_altitude
        } else {
            stats.min_altitude
        };

        Self {
            start_time: flight.started_at,
            end_time: flight.ended_at,
            duration_seconds: flight.duration().num_milliseconds() as f64 / 1000.0,
            max_altitude: round1(stats.max_altitude),
            min_altitude: round1(min_altitude),
            max_climb_rate: round1(stats.max_climb_rate),
            max_sink_rate: round1(stats.max_sink_rate),
            altitude_gain: round1(stats.max_altitude - min_altitude),
            avg_temperature: round1(stats.avg_temperature()),
            data_points: stats.sample_count,
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId::from_start(&self.start_time)
    }
}

/// Directory of flight records
#[derive(Debug, Clone)]
pub struct FlightArchive {
    dir: PathBuf,
}

impl FlightArchive {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the archive directory if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the directory cannot be created
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| VarioError::Storage(format!("Failed to create {}: {}", self.dir.display(), e)))
    }

    fn path_of(&self, id: &RecordId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    /// Persist a finished session
    ///
    /// A session starting in the same civil second as an existing record
    /// replaces it.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the record cannot be written (disk full,
    /// permission denied). The session is not retried.
    pub fn save(&self, flight: &CompletedFlight) -> Result<RecordId> {
        self.ensure_dir()?;

        let record = FlightRecord::from_flight(flight);
        let id = record.id();
        let path = self.path_of(&id);

        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)
            .map_err(|e| VarioError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Flight saved to {}", path.display());
        Ok(id)
    }

    /// All stored record ids, oldest first
    ///
    /// A missing archive directory lists as empty. Files that do not follow
    /// the record naming scheme are ignored.
    pub fn list(&self) -> Result<Vec<RecordId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VarioError::Storage(format!("Failed to read {}: {}", self.dir.display(), e)));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| VarioError::Storage(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            match name.parse::<RecordId>() {
                Ok(id) => ids.push(id),
                Err(_) => debug!("Ignoring foreign file in archive: {}", path.display()),
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Load a stored record
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id
    /// - `Storage` if the file cannot be read
    /// - `Json` if the file is not a valid record
    pub fn get(&self, id: &RecordId) -> Result<FlightRecord> {
        let path = self.path_of(id);
        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VarioError::NotFound(id.to_string()),
            _ => VarioError::Storage(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        Ok(serde_json::from_str(&contents)?)
    }

    /// Permanently remove a stored record
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id
    /// - `Storage` if the file cannot be removed
    pub fn delete(&self, id: &RecordId) -> Result<()> {
        let path = self.path_of(id);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VarioError::NotFound(id.to_string()),
            _ => VarioError::Storage(format!("Failed to delete {}: {}", path.display(), e)),
        })?;

        info!("Flight deleted: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::recorder::FlightStats;
    use tempfile::TempDir;

    fn ts(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn flight(start: &str, end: &str) -> CompletedFlight {
        CompletedFlight {
            started_at: ts(start),
            ended_at: ts(end),
            stats: FlightStats {
                max_altitude: 1523.46,
                min_altitude: 402.04,
                max_climb_rate: 3.84,
                max_sink_rate: -2.16,
                sample_count: 3,
                temperature_sum: 55.0,
            },
        }
    }

    #[test]
    fn test_record_id_from_start() {
        let id = RecordId::from_start(&ts("2024-07-14T13:05:02.734+02:00"));
        assert_eq!(id.to_string(), "flight_20240714_130502");
        assert_eq!(id.file_name(), "flight_20240714_130502.json");
    }

    #[test]
    fn test_record_id_uses_civil_time_of_offset() {
        let utc = ts("2024-07-14T11:05:02+00:00");
        let local = utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(RecordId::from_start(&local).to_string(), "flight_20240714_130502");
    }

    #[test]
    fn test_record_id_parse() {
        let id: RecordId = "flight_20240714_130502".parse().unwrap();
        assert_eq!(id.to_string(), "flight_20240714_130502");

        let with_ext: RecordId = "flight_20240714_130502.json".parse().unwrap();
        assert_eq!(with_ext, id);
    }

    #[test]
    fn test_record_id_rejects_malformed() {
        for bad in [
            "",
            "flight_",
            "flight_2024071_130502",
            "flight_20241314_130502",
            "flight_20240714-130502",
            "flight_+2024071_130502",
            "glider_20240714_130502",
            "../flight_20240714_130502",
            "flight_20240714_130502/../../etc/passwd",
        ] {
            assert!(
                matches!(bad.parse::<RecordId>(), Err(VarioError::InvalidRecordId(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_record_id_serializes_as_string() {
        let id: RecordId = "flight_20240714_130502".parse().unwrap();
        assert_eq!(serde_json::to_value(id).unwrap(), "flight_20240714_130502");

        let back: RecordId = serde_json::from_str("\"flight_20240714_130502\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"nope\"").is_err());
    }

    #[test]
    fn test_record_from_flight_rounds_and_derives() {
        let record = FlightRecord::from_flight(&flight(
            "2024-07-14T13:05:02+02:00",
            "2024-07-14T14:05:32.500+02:00",
        ));

        assert_eq!(record.duration_seconds, 3630.5);
        assert_eq!(record.max_altitude, 1523.5);
        assert_eq!(record.min_altitude, 402.0);
        assert_eq!(record.altitude_gain, 1121.4);
        assert_eq!(record.max_climb_rate, 3.8);
        assert_eq!(record.max_sink_rate, -2.2);
        assert_eq!(record.avg_temperature, 18.3);
        assert_eq!(record.data_points, 3);
    }

    #[test]
    fn test_record_from_empty_flight() {
        let empty = CompletedFlight {
            started_at: ts("2024-07-14T13:05:02+02:00"),
            ended_at: ts("2024-07-14T13:05:10+02:00"),
            stats: FlightStats::default(),
        };

        let record = FlightRecord::from_flight(&empty);
        assert_eq!(record.min_altitude, 0.0);
        assert_eq!(record.altitude_gain, 0.0);
        assert_eq!(record.avg_temperature, 0.0);
        assert_eq!(record.data_points, 0);
        assert!(serde_json::to_string(&record).is_ok());
    }

    #[test]
    fn test_save_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path());
        let flight = flight("2024-07-14T13:05:02.125+02:00", "2024-07-14T14:00:00+02:00");

        let id = archive.save(&flight).unwrap();
        assert_eq!(id.to_string(), "flight_20240714_130502");
        assert!(dir.path().join("flight_20240714_130502.json").exists());

        let loaded = archive.get(&id).unwrap();
        assert_eq!(loaded, FlightRecord::from_flight(&flight));
    }

    #[test]
    fn test_saved_file_layout() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path());
        let id = archive
            .save(&flight("2024-07-14T13:05:02+02:00", "2024-07-14T13:35:02+02:00"))
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(id.file_name())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["start_time"], "2024-07-14T13:05:02+02:00");
        assert_eq!(json["end_time"], "2024-07-14T13:35:02+02:00");
        assert_eq!(json["duration_seconds"], 1800.0);
        assert_eq!(json["data_points"], 3);
        assert!(raw.contains("\n  \"max_altitude\""), "record should be pretty-printed");
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path().join("nested").join("flights"));
        assert!(archive
            .save(&flight("2024-07-14T13:05:02+02:00", "2024-07-14T13:06:02+02:00"))
            .is_ok());
    }

    #[test]
    fn test_save_to_unwritable_location_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let archive = FlightArchive::new(&blocker);
        let result = archive.save(&flight("2024-07-14T13:05:02+02:00", "2024-07-14T13:06:02+02:00"));
        assert!(matches!(result, Err(VarioError::Storage(_))));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path());
        let id: RecordId = "flight_20240101_000000".parse().unwrap();
        assert!(matches!(archive.get(&id), Err(VarioError::NotFound(_))));
    }

    #[test]
    fn test_get_corrupt_record_is_json_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("flight_20240101_000000.json"), "{ not json").unwrap();

        let archive = FlightArchive::new(dir.path());
        let id: RecordId = "flight_20240101_000000".parse().unwrap();
        assert!(matches!(archive.get(&id), Err(VarioError::Json(_))));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path());
        let id = archive
            .save(&flight("2024-07-14T13:05:02+02:00", "2024-07-14T13:06:02+02:00"))
            .unwrap();

        archive.delete(&id).unwrap();
        assert!(matches!(archive.get(&id), Err(VarioError::NotFound(_))));
        assert!(matches!(archive.delete(&id), Err(VarioError::NotFound(_))));
    }

    #[test]
    fn test_list_after_saves_and_delete() {
        let dir = TempDir::new().unwrap();
        let archive = FlightArchive::new(dir.path());

        let starts = [
            "2024-07-14T15:00:00+02:00",
            "2024-07-14T09:30:00+02:00",
            "2024-07-15T11:00:00+02:00",
            "2024-07-14T12:00:00+02:00",
        ];
        let mut ids = Vec::new();
        for start in starts {
            ids.push(archive.save(&flight(start, "2024-07-16T00:00:00+02:00")).unwrap());
        }
        archive.delete(&ids[0]).unwrap();

        let listed = archive.list().unwrap();
        assert_eq!(listed.len(), starts.len() - 1);
        assert!(!listed.contains(&ids[0]));
        assert_eq!(
            listed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["flight_20240714_093000", "flight_20240714_120000", "flight_20240715_110000"]
        );
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("summary.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("flight_20240101_000000.json.d")).unwrap();

        let archive = FlightArchive::new(dir.path());
        assert!(archive.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let archive = FlightArchive::new("/nonexistent/vario/flights");
        assert!(archive.list().unwrap().is_empty());
    }
}
