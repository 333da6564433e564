//! UTC offsets as written in TZOFFSETTO/TZOFFSETFROM.

use chrono::TimeDelta;

/// UTC offset in seconds; positive is east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    pub seconds: i32,
}

impl UtcOffset {
    /// Creates an offset from hours, minutes and seconds, which should all
    /// carry the sign of the whole offset.
    #[must_use]
    pub const fn new(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    /// Signed hour part (`-0430` gives `-4`).
    #[must_use]
    pub const fn hours(self) -> i32 {
        self.seconds / 3600
    }

    /// Signed minute part (`-0430` gives `-30`).
    #[must_use]
    pub const fn minutes(self) -> i32 {
        (self.seconds % 3600) / 60
    }

    #[must_use]
    pub fn as_time_delta(self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.seconds))
    }

    /// Renders `±HH:MM`.
    #[must_use]
    pub fn to_colon_string(self) -> String {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let total = self.seconds.unsigned_abs();
        format!("{sign}{:02}:{:02}", total / 3600, (total % 3600) / 60)
    }
}

impl std::fmt::Display for UtcOffset {
    /// Renders the iCalendar form `±HHMM[SS]`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let total = self.seconds.unsigned_abs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if seconds == 0 {
            write!(f, "{sign}{hours:02}{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}{minutes:02}{seconds:02}")
        }
    }
}
