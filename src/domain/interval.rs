//! Candle intervals and time ranges.
//!
//! Intervals are written as a count followed by a unit, e.g. `5min`, `1hour`,
//! `1day`. Only the first letter of the unit is significant (`m`, `h`, `d`),
//! so `15m`, `1h` and `1d` are accepted too. The canonical label always uses
//! the long form.

use crate::domain::error::ParseError;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntervalUnit {
    Minute,
    Hour,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub count: u32,
    pub unit: IntervalUnit,
}

impl Interval {
    pub const DAILY: Interval = Interval {
        count: 1,
        unit: IntervalUnit::Day,
    };

    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());

        if digits_end == 0 {
            return Err(ParseError {
                message: format!("expected interval count in '{trimmed}'"),
                position: 0,
            });
        }

        let count: u32 = trimmed[..digits_end].parse().map_err(|_| ParseError {
            message: format!("invalid interval count in '{trimmed}'"),
            position: 0,
        })?;
        if count == 0 {
            return Err(ParseError {
                message: "interval count must be positive".into(),
                position: 0,
            });
        }

        let unit = match trimmed[digits_end..].chars().next() {
            Some('m') => IntervalUnit::Minute,
            Some('h') => IntervalUnit::Hour,
            Some('d') => IntervalUnit::Day,
            Some(_) => {
                return Err(ParseError {
                    message: format!("unknown interval unit in '{trimmed}'"),
                    position: digits_end,
                });
            }
            None => {
                return Err(ParseError {
                    message: format!("missing interval unit in '{trimmed}'"),
                    position: digits_end,
                });
            }
        };

        Ok(Self { count, unit })
    }

    pub fn duration(&self) -> Duration {
        let n = i64::from(self.count);
        match self.unit {
            IntervalUnit::Minute => Duration::minutes(n),
            IntervalUnit::Hour => Duration::hours(n),
            IntervalUnit::Day => Duration::days(n),
        }
    }

    /// Canonical label used as the storage key, e.g. `5min`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::DAILY
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            IntervalUnit::Minute => "min",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Day => "day",
        };
        write!(f, "{}{}", self.count, unit)
    }
}

impl FromStr for Interval {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whole days from the start of `start` to the end of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: midnight(start),
            end: midnight(end) + Duration::days(1) - Duration::seconds(1),
        }
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time <= self.end
    }

    /// Range ending at `end` and reaching back `lookback`.
    pub fn lookback(end: NaiveDateTime, lookback: Duration) -> Self {
        Self {
            start: end - lookback,
            end,
        }
    }
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM:SS`.
/// Plain dates normalize to midnight.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, ParseError> {
    let trimmed = input.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(midnight)
        .map_err(|e| ParseError {
            message: format!("invalid date '{trimmed}': {e}"),
            position: 0,
        })
}

pub fn format_datetime(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
