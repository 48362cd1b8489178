//! Nearest-neighbour lookup on irregular grids.
//!
//! Valid grid points are bucketed by integer degree `(floor(lat), floor(lon))`.
//! A point lying within `threshold` of its bucket edge is also filed under the
//! neighbouring bucket across that edge (corners need both components close), so
//! a query just across a boundary still sees its true nearest neighbour.
//!
//! The nearest point maps to an `(x, y)` grid index; the index's position in the
//! published cell order, divided by `chunk_size`, selects the archive that holds
//! the column.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dweather_common::{BoundingBox, Coordinate, DWeatherError, DWeatherResult};

use crate::convention::to_shifted;
use crate::shard::{irregular_member, ShardKey};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// One valid grid point and its grid index. Coordinates are in shifted convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    pub x: u32,
    pub y: u32,
}

impl GridPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Serialized index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrregularGridDocument {
    pub points: Vec<GridPoint>,
    /// Sequential order of `(x, y)` cells; defaults to the order of `points`.
    #[serde(default)]
    pub cell_order: Option<Vec<(u32, u32)>>,
    /// Archive file names, one per chunk of `chunk_size` cells.
    pub archives: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_bounds")]
    pub bounds: BoundingBox,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_bounds() -> BoundingBox {
    BoundingBox::new(20.0, 53.0, 228.0, 300.0)
}

/// Result of an irregular-grid lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IrregularMatch {
    /// Matched grid point, shifted convention.
    pub point: Coordinate,
    pub x: u32,
    pub y: u32,
    pub shard: ShardKey,
}

type BucketKey = (i32, i32);

/// Immutable bucket index over an irregular grid.
#[derive(Debug, Clone)]
pub struct IrregularGrid {
    buckets: HashMap<BucketKey, Vec<GridPoint>>,
    sequence: HashMap<(u32, u32), usize>,
    archives: Vec<String>,
    chunk_size: usize,
    bounds: BoundingBox,
    threshold: f64,
}

impl IrregularGrid {
    /// Parse an index document (already decompressed).
    pub fn from_json(bytes: &[u8]) -> DWeatherResult<Self> {
        let doc: IrregularGridDocument = serde_json::from_slice(bytes)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: IrregularGridDocument) -> DWeatherResult<Self> {
        if doc.chunk_size == 0 {
            return Err(DWeatherError::data_malformed(
                "irregular grid chunk_size must be positive",
            ));
        }
        if !(doc.threshold >= 0.0 && doc.threshold < 1.0) {
            return Err(DWeatherError::data_malformed(format!(
                "irregular grid threshold {} outside [0, 1)",
                doc.threshold
            )));
        }

        let order: Vec<(u32, u32)> = match doc.cell_order {
            Some(order) => order,
            None => doc.points.iter().map(|p| (p.x, p.y)).collect(),
        };
        let mut sequence = HashMap::with_capacity(order.len());
        for (index, cell) in order.into_iter().enumerate() {
            sequence.entry(cell).or_insert(index);
        }

        let mut buckets: HashMap<BucketKey, Vec<GridPoint>> = HashMap::new();
        for point in &doc.points {
            for key in bucket_keys(point, doc.threshold) {
                buckets.entry(key).or_default().push(*point);
            }
        }

        debug!(
            points = doc.points.len(),
            buckets = buckets.len(),
            archives = doc.archives.len(),
            "Built irregular grid index"
        );

        Ok(Self {
            buckets,
            sequence,
            archives: doc.archives,
            chunk_size: doc.chunk_size,
            bounds: doc.bounds,
            threshold: doc.threshold,
        })
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Candidates filed under the bucket of a shifted-convention coordinate.
    pub fn candidates(&self, coord: Coordinate) -> &[GridPoint] {
        self.buckets
            .get(&bucket_of(coord.lat, coord.lon))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve a coordinate in either convention to its grid point and shard.
    pub fn locate(&self, coord: Coordinate) -> DWeatherResult<IrregularMatch> {
        let coord = to_shifted(coord);
        if !self.bounds.contains(&coord) {
            return Err(DWeatherError::input_out_of_range(format!(
                "{} outside irregular grid coverage lat [{}, {}] lon [{}, {}]",
                coord,
                self.bounds.min_lat,
                self.bounds.max_lat,
                self.bounds.min_lon,
                self.bounds.max_lon
            )));
        }

        let nearest = self
            .candidates(coord)
            .iter()
            .min_by(|a, b| {
                coord
                    .distance_sq(&a.coordinate())
                    .total_cmp(&coord.distance_sq(&b.coordinate()))
            })
            .ok_or_else(|| {
                DWeatherError::coordinate_not_found(format!("no grid point near {}", coord))
            })?;

        let archive = self.archive_for(nearest.x, nearest.y)?;
        let shard = ShardKey::new(archive, irregular_member(nearest.x, nearest.y));
        Ok(IrregularMatch {
            point: nearest.coordinate(),
            x: nearest.x,
            y: nearest.y,
            shard: shard.with_zip_fallback(),
        })
    }

    /// Archive holding column `(x, y)`: `archives[sequential_index / chunk_size]`.
    pub fn archive_for(&self, x: u32, y: u32) -> DWeatherResult<String> {
        let index = self.sequence.get(&(x, y)).ok_or_else(|| {
            DWeatherError::coordinate_not_found(format!("grid cell ({}, {}) has no data", x, y))
        })?;
        let chunk = index / self.chunk_size;
        self.archives.get(chunk).cloned().ok_or_else(|| {
            DWeatherError::data_malformed(format!(
                "grid cell ({}, {}) falls in chunk {} but only {} archives are listed",
                x,
                y,
                chunk,
                self.archives.len()
            ))
        })
    }
}

fn bucket_of(lat: f64, lon: f64) -> BucketKey {
    (lat.floor() as i32, lon.floor() as i32)
}

/// Home bucket plus every neighbour whose shared edge lies within `threshold`.
fn bucket_keys(point: &GridPoint, threshold: f64) -> Vec<BucketKey> {
    let (lat0, lon0) = bucket_of(point.lat, point.lon);
    let lat_steps = neighbour_steps(point.lat, threshold);
    let lon_steps = neighbour_steps(point.lon, threshold);

    let mut keys = Vec::with_capacity(lat_steps.len() * lon_steps.len());
    for dlat in &lat_steps {
        for dlon in &lon_steps {
            keys.push((lat0 + dlat, lon0 + dlon));
        }
    }
    keys
}

/// Offsets along one axis: always 0, plus -1 or +1 when near that edge.
fn neighbour_steps(value: f64, threshold: f64) -> Vec<i32> {
    let floor = value.floor();
    let mut steps = vec![0];
    if value - floor <= threshold {
        steps.push(-1);
    }
    if floor + 1.0 - value <= threshold {
        steps.push(1);
    }
    steps
}
