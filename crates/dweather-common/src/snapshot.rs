//! Snapshot identity and published metadata.
//!
//! A snapshot is one immutable, content-addressed revision of a dataset. Its
//! `metadata.json` carries the back-pointer to the previous revision along with
//! the coverage and grid description needed to read its shards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DWeatherError, DWeatherResult};
use crate::geo::{BoundingBox, Coordinate};
use crate::time::{parse_timestamp, DateRange};

/// Name of the metadata document stored at the root of every snapshot.
pub const METADATA_FILE: &str = "metadata.json";

/// Decimal places used in shard file names when metadata does not say otherwise.
pub const DEFAULT_FILENAME_PRECISION: u32 = 3;

/// Opaque content hash identifying a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SnapshotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Publisher's marker for an absent observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingSentinel(String);

impl MissingSentinel {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Textual match, or numeric match when both sides parse (`-999` vs `-999.00`).
    pub fn matches(&self, raw: &str) -> bool {
        let raw = raw.trim();
        if raw == self.0 {
            return true;
        }
        match (raw.parse::<f64>(), self.0.parse::<f64>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Parsed `metadata.json` of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMetadata {
    pub previous_id: Option<SnapshotId>,
    pub generated_at: DateTime<Utc>,
    pub covered_range: DateRange,
    /// Overall coverage of the whole chain, published on heads of date-windowed datasets.
    pub full_covered_range: Option<DateRange>,
    pub resolution: Option<f64>,
    pub bbox: Option<BoundingBox>,
    pub missing_sentinel: Option<MissingSentinel>,
    pub native_unit: Option<String>,
    pub filename_precision: u32,
    pub compression: Option<String>,
}

impl SnapshotMetadata {
    /// Parse a `metadata.json` document.
    pub fn from_json(bytes: &[u8]) -> DWeatherResult<Self> {
        let raw: RawMetadata = serde_json::from_slice(bytes)?;
        raw.try_into()
    }

    /// Minimum latitude and longitude of the published grid.
    pub fn origin(&self) -> Option<Coordinate> {
        self.bbox.map(|b| Coordinate::new(b.min_lat, b.min_lon))
    }

    pub fn is_root(&self) -> bool {
        self.previous_id.is_none()
    }
}

/// One snapshot: its id plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    pub fn new(id: SnapshotId, metadata: SnapshotMetadata) -> Self {
        Self { id, metadata }
    }

    pub fn is_root(&self) -> bool {
        self.metadata.is_root()
    }
}

/// Wire layout of `metadata.json`. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "previous hash", default)]
    previous_hash: Option<String>,
    #[serde(rename = "time generated")]
    time_generated: Option<String>,
    #[serde(rename = "date range")]
    date_range: Option<[String; 2]>,
    #[serde(rename = "full date range", default)]
    full_date_range: Option<[String; 2]>,
    #[serde(default)]
    resolution: Option<f64>,
    #[serde(rename = "latitude range", default)]
    latitude_range: Option<[f64; 2]>,
    #[serde(rename = "longitude range", default)]
    longitude_range: Option<[f64; 2]>,
    #[serde(rename = "missing value", default)]
    missing_value: Option<serde_json::Value>,
    #[serde(rename = "unit of measurement", default)]
    unit_of_measurement: Option<String>,
    #[serde(rename = "filename decimal precision", default)]
    filename_decimal_precision: Option<u32>,
    #[serde(default)]
    compression: Option<String>,
}

impl TryFrom<RawMetadata> for SnapshotMetadata {
    type Error = DWeatherError;

    fn try_from(raw: RawMetadata) -> Result<Self, Self::Error> {
        let generated = raw
            .time_generated
            .ok_or_else(|| DWeatherError::data_malformed("metadata lacks 'time generated'"))?;
        let generated_at = parse_timestamp(&generated)
            .map_err(|e| DWeatherError::data_malformed(format!("'time generated': {}", e)))?;

        let [start, end] = raw
            .date_range
            .ok_or_else(|| DWeatherError::data_malformed("metadata lacks 'date range'"))?;
        let covered_range = DateRange::parse(&start, &end)
            .map_err(|e| DWeatherError::data_malformed(format!("'date range': {}", e)))?;

        let full_covered_range = match raw.full_date_range {
            Some([start, end]) => Some(
                DateRange::parse(&start, &end).map_err(|e| {
                    DWeatherError::data_malformed(format!("'full date range': {}", e))
                })?,
            ),
            None => None,
        };

        let bbox = match (raw.latitude_range, raw.longitude_range) {
            (Some(lat), Some(lon)) => Some(BoundingBox::from_ranges(lat, lon)),
            _ => None,
        };

        let missing_sentinel = match raw.missing_value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(MissingSentinel::new(s)),
            Some(serde_json::Value::Number(n)) => Some(MissingSentinel::new(n.to_string())),
            Some(other) => {
                return Err(DWeatherError::data_malformed(format!(
                    "'missing value' must be a string or number, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            previous_id: raw.previous_hash.map(SnapshotId::from),
            generated_at,
            covered_range,
            full_covered_range,
            resolution: raw.resolution,
            bbox,
            missing_sentinel,
            native_unit: raw.unit_of_measurement,
            filename_precision: raw
                .filename_decimal_precision
                .unwrap_or(DEFAULT_FILENAME_PRECISION),
            compression: raw.compression,
        })
    }
}
