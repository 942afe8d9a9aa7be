//! Requested date/time handling
//!
//! Citizens pick a wall-clock date (`YYYY-MM-DD`) and time (`HH:MM`). Both are
//! always read as Indian Standard Time (UTC+05:30), whatever the locale of the
//! server or the client.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::{Error, Result};

/// IST offset from UTC in seconds
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Hours before the requested time at which an assigned request stops being cancellable
pub const CANCEL_CUTOFF_HOURS: i64 = 2;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// The fixed IST offset
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within one day")
}

/// A parsed requested date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    local: NaiveDateTime,
}

impl Schedule {
    /// Parse a date and time as entered by the citizen
    pub fn parse(date: &str, time: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|e| Error::InvalidSchedule(format!("date {date:?}: {e}")))?;
        let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
            .map_err(|e| Error::InvalidSchedule(format!("time {time:?}: {e}")))?;
        Ok(Self {
            local: date.and_time(time),
        })
    }

    /// The requested moment as an absolute instant
    pub fn starts_at(&self) -> DateTime<Utc> {
        let utc = self.local - Duration::seconds(i64::from(IST_OFFSET_SECS));
        Utc.from_utc_datetime(&utc)
    }

    /// The requested moment in IST
    pub fn starts_at_ist(&self) -> DateTime<FixedOffset> {
        self.starts_at().with_timezone(&ist())
    }

    /// True once the requested moment is strictly in the past
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.starts_at()
    }

    /// Last instant an assigned request may still be cancelled by the citizen
    pub fn cancel_cutoff(&self) -> DateTime<Utc> {
        self.starts_at() - Duration::hours(CANCEL_CUTOFF_HOURS)
    }

    /// True while `now` has not gone past the cancel cutoff
    pub fn allows_cancel(&self, now: DateTime<Utc>) -> bool {
        now <= self.cancel_cutoff()
    }

    /// Time left until the requested moment (negative once passed)
    pub fn lead_time(&self, now: DateTime<Utc>) -> Duration {
        self.starts_at() - now
    }
}
