//! Time series values and containers.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// One entry of a series: a parsed value with its published text, or an explicit gap.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Value {
        /// Text as published; its decimal count drives precision-preserving rounding.
        raw: String,
        value: f64,
    },
    Missing,
}

impl Observation {
    pub fn value(raw: impl Into<String>, value: f64) -> Self {
        Observation::Value {
            raw: raw.into(),
            value,
        }
    }

    /// Parse a published decimal string.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        trimmed.parse::<f64>().ok().map(|value| Observation::Value {
            raw: trimmed.to_string(),
            value,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Observation::Value { value, .. } => Some(*value),
            Observation::Missing => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Observation::Value { raw, .. } => Some(raw),
            Observation::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Observation::Missing)
    }
}

impl Serialize for Observation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Observation::Value { value, .. } => serializer.serialize_f64(*value),
            Observation::Missing => serializer.serialize_none(),
        }
    }
}

/// Timestamp-ordered series with at most one observation per timestamp.
///
/// Daily series are keyed at midnight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: BTreeMap<NaiveDateTime, Observation>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any existing entry. Returns the replaced entry.
    pub fn insert(&mut self, at: NaiveDateTime, obs: Observation) -> Option<Observation> {
        self.points.insert(at, obs)
    }

    /// Insert only if the timestamp is not yet present. Returns whether it was written.
    pub fn insert_if_absent(&mut self, at: NaiveDateTime, obs: Observation) -> bool {
        match self.points.entry(at) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(obs);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn remove(&mut self, at: &NaiveDateTime) -> Option<Observation> {
        self.points.remove(at)
    }

    pub fn get(&self, at: &NaiveDateTime) -> Option<&Observation> {
        self.points.get(at)
    }

    pub fn contains(&self, at: &NaiveDateTime) -> bool {
        self.points.contains_key(at)
    }

    /// Whether any entry falls on the given calendar date.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        match (date.and_hms_opt(0, 0, 0), date.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0))) {
            (Some(start), Some(end)) => self.points.range(start..end).next().is_some(),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, &Observation)> {
        self.points.iter()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.points.keys()
    }

    /// Number of entries that are explicit gaps.
    pub fn missing_count(&self) -> usize {
        self.points.values().filter(|o| o.is_missing()).count()
    }

    /// Apply a fallible transformation to every present value.
    pub fn try_map_values<E, F>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&str, f64) -> Result<Observation, E>,
    {
        let mut points = BTreeMap::new();
        for (at, obs) in self.points {
            let mapped = match obs {
                Observation::Value { raw, value } => f(&raw, value)?,
                Observation::Missing => Observation::Missing,
            };
            points.insert(at, mapped);
        }
        Ok(Self { points })
    }
}

impl FromIterator<(NaiveDateTime, Observation)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDateTime, Observation)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TimeSeries {
    type Item = (NaiveDateTime, Observation);
    type IntoIter = std::collections::btree_map::IntoIter<NaiveDateTime, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
