//! Cross-dataset reconciliation over a revision set.
//!
//! A revision set lists datasets measuring the same quantity, most accurate
//! first. The merged series takes every timestamp from the most accurate
//! revision that has it. Revisions up to and including the configured boundary
//! count as final; anything past it is preliminary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use dweather_common::{Coordinate, DWeatherError, DWeatherResult, TimeSeries};

/// Supplies the full series of one dataset at a coordinate.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch_series(&self, dataset: &str, coord: Coordinate) -> DWeatherResult<TimeSeries>;
}

/// Accuracy-ordered datasets for one physical quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSet {
    pub name: String,
    /// Dataset names, index 0 most accurate.
    pub revisions: Vec<String>,
    /// Least accurate revision still considered final when the caller names none.
    #[serde(default)]
    pub last_final: Option<String>,
}

impl RevisionSet {
    pub fn new(name: impl Into<String>, revisions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            revisions,
            last_final: None,
        }
    }

    pub fn with_last_final(mut self, revision: impl Into<String>) -> Self {
        self.last_final = Some(revision.into());
        self
    }

    pub fn index_of(&self, revision: &str) -> Option<usize> {
        self.revisions.iter().position(|r| r == revision)
    }

    /// Index of the last final revision. With no boundary named, every revision is final.
    pub fn final_boundary(&self, last_final: Option<&str>) -> DWeatherResult<usize> {
        match last_final.or(self.last_final.as_deref()) {
            None => Ok(self.revisions.len().saturating_sub(1)),
            Some(name) => self.index_of(name).ok_or_else(|| {
                DWeatherError::dataset(format!(
                    "{} is not a revision of {} ({})",
                    name,
                    self.name,
                    self.revisions.join(", ")
                ))
            }),
        }
    }
}

/// Whether `revision` is at or before the final boundary `last_final`.
pub fn is_revision_final(
    set: &RevisionSet,
    revision: &str,
    last_final: Option<&str>,
) -> DWeatherResult<bool> {
    let boundary = set.final_boundary(last_final)?;
    let index = set.index_of(revision).ok_or_else(|| {
        DWeatherError::dataset(format!("{} is not a revision of {}", revision, set.name))
    })?;
    Ok(index <= boundary)
}

/// Outcome of [`merge_revision_set`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionMerge {
    pub series: TimeSeries,
    pub is_final: bool,
    /// Index into the revision set of the revision that supplied each timestamp.
    pub provenance: BTreeMap<NaiveDateTime, usize>,
    /// Number of revisions fetched before stopping.
    pub consulted: usize,
}

/// Merge a revision set at one coordinate, most accurate first.
///
/// With `desired_end`, fetching stops as soon as the merged series holds that
/// date and `is_final` reports whether the revision reaching it was final; if no
/// revision reaches it, everything gathered is returned with `is_final = false`.
/// Without `desired_end`, every revision is consumed and `is_final` holds iff no
/// timestamp came from past the boundary.
#[instrument(skip(source, set), fields(set = %set.name, coord = %coord))]
pub async fn merge_revision_set<S>(
    source: &S,
    set: &RevisionSet,
    coord: Coordinate,
    desired_end: Option<NaiveDate>,
    last_final: Option<&str>,
) -> DWeatherResult<RevisionMerge>
where
    S: SeriesSource + ?Sized,
{
    let boundary = set.final_boundary(last_final)?;
    let mut series = TimeSeries::new();
    let mut provenance = BTreeMap::new();
    let mut is_final = true;

    for (index, dataset) in set.revisions.iter().enumerate() {
        let partial = source.fetch_series(dataset, coord).await?;
        let mut added = 0usize;
        for (at, obs) in partial {
            if series.insert_if_absent(at, obs) {
                provenance.insert(at, index);
                added += 1;
            }
        }
        debug!(revision = %dataset, index, added, "Merged revision");

        if let Some(end) = desired_end {
            if series.contains_date(end) {
                info!(revision = %dataset, is_final, "Reached desired end");
                return Ok(RevisionMerge {
                    series,
                    is_final,
                    provenance,
                    consulted: index + 1,
                });
            }
        }
        if index == boundary {
            is_final = false;
        }
    }

    let is_final = match desired_end {
        Some(_) => false,
        None => provenance.values().all(|&index| index <= boundary),
    };
    Ok(RevisionMerge {
        series,
        is_final,
        provenance,
        consulted: set.revisions.len(),
    })
}
