//! Timestamp parsing, covered date ranges and dataset cadence.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Range end {end} precedes start {start}")]
    Inverted { start: String, end: String },
}

/// Parse a published timestamp.
///
/// Accepts RFC 3339, naive ISO datetimes (assumed UTC), and plain dates written
/// with either `-` or `/` separators (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    parse_naive(s).map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Parse a timestamp without timezone information.
pub fn parse_naive(s: &str) -> Result<NaiveDateTime, TimeParseError> {
    let s = s.trim();
    let normalized = s.replace('/', "-");

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(ndt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }

    if let Some(ndt) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(ndt);
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Inclusive `[start, end]` range covered by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, TimeParseError> {
        if end < start {
            return Err(TimeParseError::Inverted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a published `[start, end]` pair.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeParseError> {
        Self::new(parse_naive(start)?, parse_naive(end)?)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Calendar-date containment; time-of-day components are ignored.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Number of samples implied by the range at the given cadence, counting both ends.
    pub fn expected_steps(&self, cadence: Cadence) -> usize {
        let span = self.end - self.start;
        let step = cadence.step();
        if step.num_seconds() <= 0 {
            return 0;
        }
        (span.num_seconds() / step.num_seconds()) as usize + 1
    }
}

/// Sampling cadence of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Hourly,
    Weekly,
    /// Fixed step of the given number of hours.
    Hours(u32),
}

impl Default for Cadence {
    fn default() -> Self {
        Self::Daily
    }
}

impl Cadence {
    pub fn step(&self) -> Duration {
        match self {
            Cadence::Daily => Duration::days(1),
            Cadence::Hourly => Duration::hours(1),
            Cadence::Weekly => Duration::days(7),
            Cadence::Hours(h) => Duration::hours(*h as i64),
        }
    }

    /// Infer the cadence from a published dataset name such as `chirps_05-daily`.
    pub fn infer(dataset: &str) -> Self {
        if dataset.contains("hourly") {
            Cadence::Hourly
        } else if dataset.contains("weekly") {
            Cadence::Weekly
        } else {
            Cadence::Daily
        }
    }

    /// Whether timestamps at this cadence carry a meaningful time of day.
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Cadence::Hourly | Cadence::Hours(_))
    }
}
