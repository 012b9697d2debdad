//! # Session Clock
//!
//! Supplies civil timestamps in a fixed, configured timezone.
//!
//! Reading timestamps, session boundaries and archive names all come from the
//! same clock so a flight recorded at 14:03 local time is stored as
//! `flight_YYYYMMDD_140300` regardless of the host's own timezone setting.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

use crate::error::{Result, VarioError};

/// Source of zoned wall-clock time
pub trait SessionClock: Send + Sync {
    /// Current instant, expressed with the configured zone's offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Clock pinned to a named IANA timezone
#[derive(Debug, Clone, Copy)]
pub struct ZoneClock {
    tz: Tz,
}

impl ZoneClock {
    /// Create a clock for the given IANA zone name (e.g. "Europe/Belgrade")
    ///
    /// # Errors
    ///
    /// Returns `Timezone` if the name is not in the tz database
    pub fn new(name: &str) -> Result<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|e| VarioError::Timezone(format!("{}: {}", name, e)))?;
        Ok(Self { tz })
    }

    /// The zone this clock reports in
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl SessionClock for ZoneClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz).fixed_offset()
    }
}
