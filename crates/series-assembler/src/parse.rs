//! Shard payload parsing.
//!
//! A shard holds one coordinate's values for the whole range its snapshot covers.
//! Text shards are comma separated within a line and newline separated between
//! lines; float32 shards are packed little-endian values. Either way the first value
//! belongs to the layout's start and each next one advances by the cadence step.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use dweather_common::{
    round_to, Cadence, DWeatherError, DWeatherResult, MissingSentinel, Observation,
    SnapshotMetadata, TimeSeries,
};

/// Decimal places kept when rendering float32 values as text.
pub const F32_DECIMALS: i32 = 4;

/// How lines of a text shard map onto time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// Lines are only a wrapping convenience; values run on without a break.
    #[default]
    Continuous,
    /// Line `n > 0` starts on January 1st of the start year plus `n`.
    CalendarYears,
}

/// Where a shard's values sit in time and how its gaps are marked.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardLayout {
    pub start: NaiveDateTime,
    pub cadence: Cadence,
    pub rows: RowLayout,
    pub sentinel: Option<MissingSentinel>,
    /// Value count the payload must contain, checked for continuous layouts.
    pub expected_steps: Option<usize>,
}

impl ShardLayout {
    pub fn new(start: NaiveDateTime, cadence: Cadence) -> Self {
        Self {
            start,
            cadence,
            rows: RowLayout::Continuous,
            sentinel: None,
            expected_steps: None,
        }
    }

    /// Layout of a shard in the given snapshot: starts at the covered range and
    /// must hold exactly one value per step of it.
    pub fn for_snapshot(meta: &SnapshotMetadata, cadence: Cadence) -> Self {
        Self {
            start: meta.covered_range.start,
            cadence,
            rows: RowLayout::Continuous,
            sentinel: meta.missing_sentinel.clone(),
            expected_steps: Some(meta.covered_range.expected_steps(cadence)),
        }
    }

    pub fn with_rows(mut self, rows: RowLayout) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_sentinel(mut self, sentinel: Option<MissingSentinel>) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn expecting(mut self, steps: Option<usize>) -> Self {
        self.expected_steps = steps;
        self
    }

    /// Replace the start, dropping the count check that was tied to the old one.
    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        if start != self.start {
            self.expected_steps = None;
        }
        self.start = start;
        self
    }

    fn is_missing(&self, raw: &str) -> bool {
        self.sentinel.as_ref().is_some_and(|s| s.matches(raw))
    }

    fn check_count(&self, found: usize) -> DWeatherResult<()> {
        match self.expected_steps {
            Some(expected) if self.rows == RowLayout::Continuous && expected != found => {
                Err(DWeatherError::data_malformed(format!(
                    "shard holds {} values but its range implies {}",
                    found, expected
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Parse a text shard.
///
/// Empty fields are gaps and produce no entry. Fields matching the sentinel become
/// [`Observation::Missing`], as do fields that parse to NaN.
pub fn parse_text_shard(text: &str, layout: &ShardLayout) -> DWeatherResult<TimeSeries> {
    let body = text.trim_end_matches(['\n', '\r']);
    let mut series = TimeSeries::new();
    if body.is_empty() {
        layout.check_count(0)?;
        return Ok(series);
    }

    let step = layout.cadence.step();
    let mut cursor = layout.start;
    let mut fields = 0usize;

    for (row, line) in body.split('\n').enumerate() {
        if layout.rows == RowLayout::CalendarYears && row > 0 {
            cursor = year_start(layout.start.year() + row as i32)?;
        }
        for field in line.split(',') {
            let field = field.trim();
            fields += 1;
            if !field.is_empty() {
                series.insert(cursor, classify(field, layout, cursor)?);
            }
            cursor += step;
        }
    }

    layout.check_count(fields)?;
    debug!(fields, entries = series.len(), "Parsed text shard");
    Ok(series)
}

/// Parse a little-endian float32 shard, one value per step.
pub fn parse_f32_shard(bytes: &[u8], layout: &ShardLayout) -> DWeatherResult<TimeSeries> {
    if bytes.len() % 4 != 0 {
        return Err(DWeatherError::data_malformed(format!(
            "float32 shard length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    let count = bytes.len() / 4;
    layout.check_count(count)?;

    let step = layout.cadence.step();
    let mut cursor = layout.start;
    let mut series = TimeSeries::new();
    for chunk in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let obs = if value.is_nan() {
            Observation::Missing
        } else {
            let rounded = round_to(value as f64, F32_DECIMALS);
            let raw = rounded.to_string();
            if layout.is_missing(&raw) {
                Observation::Missing
            } else {
                Observation::value(raw, rounded)
            }
        };
        series.insert(cursor, obs);
        cursor += step;
    }
    Ok(series)
}

fn classify(field: &str, layout: &ShardLayout, at: NaiveDateTime) -> DWeatherResult<Observation> {
    if layout.is_missing(field) {
        return Ok(Observation::Missing);
    }
    match Observation::parse(field) {
        Some(obs) if obs.as_f64().is_some_and(f64::is_nan) => Ok(Observation::Missing),
        Some(obs) => Ok(obs),
        None => Err(DWeatherError::data_malformed(format!(
            "unparseable value '{}' at {}",
            field, at
        ))),
    }
}

fn year_start(year: i32) -> DWeatherResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DWeatherError::data_malformed(format!("year {} out of range", year)))
}
