//! Time-of-day and duration parsing for routine entries.
//!
//! Routine payloads carry wall-clock times as `"HH:MM"` strings and durations
//! as free text (`"45 minutes"`, `"2 hours"`). Record timestamps arrive either
//! as RFC 3339 or as naive ISO 8601 without an offset. Everything here is
//! lenient: bad input yields `None`, never an error.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A time of day with minute precision.
///
/// Stored as minutes since midnight. Values produced by adding a duration may
/// exceed one day so that an activity starting at 23:30 and lasting an hour
/// still ends *after* it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u32,
}

impl TimeOfDay {
    /// Build from hour and minute, `None` if out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self {
                minutes: hour * 60 + minute,
            })
        } else {
            None
        }
    }

    /// Parse a 24-hour `"HH:MM"` string. `"HH:MM:SS"` is accepted and
    /// truncated to the minute.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
            .map(Self::from)
    }

    pub fn hour(&self) -> u32 {
        (self.minutes % MINUTES_PER_DAY) / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes % 60
    }

    /// Add a duration. Negative durations are ignored; huge ones saturate.
    pub fn plus(&self, duration: Duration) -> Self {
        let minutes = duration.num_minutes();
        if minutes <= 0 {
            return *self;
        }
        let extra = u32::try_from(minutes).unwrap_or(u32::MAX);
        Self {
            minutes: self.minutes.saturating_add(extra),
        }
    }

    /// Render as zero-padded `"HH:MM"`.
    pub fn format(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }

    /// Render as `"h:mm AM"` for display.
    pub fn format_12h(&self) -> String {
        let hour = self.hour();
        let suffix = if hour >= 12 { "PM" } else { "AM" };
        let display = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", display, self.minute(), suffix)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self {
            minutes: time.hour() * 60 + time.minute(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Parse a free-text duration.
///
/// The first integer in the text is the amount. If the word right after it
/// starts with `h` (`"2 hours"`, `"1hr"`) it counts hours, otherwise minutes.
/// Text without any digits is "no duration known".
pub fn parse_duration(text: &str) -> Option<Duration> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let amount: i64 = rest[..end].parse().ok()?;

    let unit = rest[end..].trim_start();
    if unit.starts_with(['h', 'H']) {
        Duration::try_hours(amount)
    } else {
        Duration::try_minutes(amount)
    }
}

/// Parse a record timestamp.
///
/// RFC 3339 is tried first. A timestamp without an offset, such as
/// `"2025-04-09T10:00:00.123456"`, is read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// `deserialize_with` helper for optional timestamps. Values that are not a
/// parsable string become `None` instead of failing the record.
pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}
