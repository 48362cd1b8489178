//! Rainfall totals over date periods.
//!
//! A period is an inclusive run of calendar days. Totals read the daily series
//! at midnight of each day and can cap each day's contribution.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::debug;

use dweather_common::{DWeatherError, DWeatherResult, TimeSeries};

/// First year of the historical record for per-year totals.
pub const HISTORICAL_START_YEAR: i32 = 1981;

/// Total over one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub total: f64,
    pub days: usize,
}

/// Options for [`historical_totals`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalOptions {
    pub start_year: i32,
    /// Last year whose period is included; defaults to the year of the period start.
    pub end_year: Option<i32>,
    /// Count missing days as zero instead of voiding the year.
    pub ignore_missing: bool,
}

impl Default for HistoricalOptions {
    fn default() -> Self {
        Self {
            start_year: HISTORICAL_START_YEAR,
            end_year: None,
            ignore_missing: false,
        }
    }
}

/// Every day from `start` through `end`, inclusive.
pub fn period_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// End of the period actually covered.
///
/// A preliminary series that stops before `end` cuts the period at its last
/// timestamp; a final series keeps `end` as requested.
pub fn covered_end(series: &TimeSeries, end: NaiveDate, is_final: bool) -> NaiveDate {
    if is_final || series.contains_date(end) {
        return end;
    }
    series.last_timestamp().map(|t| t.date()).unwrap_or(end)
}

/// Sum of daily values over `[start, end]`.
///
/// A day absent from the series is a `DateOutOfRange` error and a day marked
/// missing is `DataMalformed`.
pub fn sum_period(
    series: &TimeSeries,
    start: NaiveDate,
    end: NaiveDate,
    daily_cap: Option<f64>,
) -> DWeatherResult<PeriodTotal> {
    let days = period_dates(start, end);
    let mut total = 0.0;
    for day in &days {
        let value = day_value(series, *day)?.ok_or_else(|| {
            DWeatherError::data_malformed(format!("no rainfall value recorded on {}", day))
        })?;
        total += cap(value, daily_cap);
    }
    Ok(PeriodTotal {
        total,
        days: days.len(),
    })
}

/// Per-year totals of the period `[start, end]` moved into each year from
/// `start_year` through `end_year`.
///
/// A period that crosses a year boundary keeps its span: the key is the year the
/// period starts in. A year with a missing day maps to `None` unless
/// `ignore_missing` is set, in which case missing days count as zero.
pub fn historical_totals(
    series: &TimeSeries,
    start: NaiveDate,
    end: NaiveDate,
    daily_cap: Option<f64>,
    options: &HistoricalOptions,
) -> DWeatherResult<BTreeMap<i32, Option<PeriodTotal>>> {
    let span = end.year() - start.year();
    let end_year = options.end_year.unwrap_or_else(|| start.year());

    let mut totals = BTreeMap::new();
    for year in options.start_year..=end_year {
        let days = period_dates(in_year(start, year), in_year(end, year + span));
        let mut values = Vec::with_capacity(days.len());
        for day in &days {
            values.push(day_value(series, *day)?);
        }

        if values.iter().any(Option::is_none) && !options.ignore_missing {
            debug!(year, "Period has missing days");
            totals.insert(year, None);
            continue;
        }
        let total = values
            .into_iter()
            .map(|v| cap(v.unwrap_or(0.0), daily_cap))
            .sum();
        totals.insert(
            year,
            Some(PeriodTotal {
                total,
                days: days.len(),
            }),
        );
    }
    Ok(totals)
}

/// Value on `day`: `Some` for a number, `None` when marked missing.
fn day_value(series: &TimeSeries, day: NaiveDate) -> DWeatherResult<Option<f64>> {
    series
        .get(&NaiveDateTime::new(day, NaiveTime::MIN))
        .map(|obs| obs.as_f64())
        .ok_or_else(|| DWeatherError::date_out_of_range(format!("series has no entry on {}", day)))
}

fn cap(value: f64, daily_cap: Option<f64>) -> f64 {
    match daily_cap {
        Some(limit) => value.min(limit),
        None => value,
    }
}

/// `date` moved into `year`; February 29th becomes the 28th outside leap years.
fn in_year(date: NaiveDate, year: i32) -> NaiveDate {
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}
