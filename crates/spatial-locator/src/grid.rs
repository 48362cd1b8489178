//! Uniform grid snapping.

use serde::{Deserialize, Serialize};

use dweather_common::{
    round_to, BoundingBox, Coordinate, DWeatherError, DWeatherResult, SnapshotMetadata,
};

/// Snap one axis to the nearest grid line:
/// `round(round((v - origin) / resolution) * resolution + origin, precision)`.
pub fn snap_value(value: f64, origin: f64, resolution: f64, precision: u32) -> f64 {
    let cells = ((value - origin) / resolution).round();
    round_to(cells * resolution + origin, precision as i32)
}

/// Snap a coordinate to the nearest grid point. No clamping is applied.
pub fn snap(coord: Coordinate, origin: Coordinate, resolution: f64, precision: u32) -> Coordinate {
    Coordinate::new(
        snap_value(coord.lat, origin.lat, resolution, precision),
        snap_value(coord.lon, origin.lon, resolution, precision),
    )
}

/// Where grid coordinates sit relative to the published origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAnchor {
    /// Grid points start at the published range minima.
    #[default]
    Corner,
    /// Grid points are cell centres, half a resolution step inside the minima.
    CellCentre,
}

/// A uniform grid as described by snapshot metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub origin: Coordinate,
    pub resolution: f64,
    pub precision: u32,
    pub bounds: BoundingBox,
}

impl GridSpec {
    /// Build from metadata carrying `resolution` and lat/lon ranges.
    pub fn from_metadata(meta: &SnapshotMetadata, anchor: GridAnchor) -> DWeatherResult<Self> {
        let resolution = meta
            .resolution
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| DWeatherError::dataset("metadata lacks a positive 'resolution'"))?;
        let bounds = meta
            .bbox
            .ok_or_else(|| DWeatherError::dataset("metadata lacks latitude/longitude ranges"))?;

        let mut origin = Coordinate::new(bounds.min_lat, bounds.min_lon);
        if anchor == GridAnchor::CellCentre {
            origin.lat += resolution / 2.0;
            origin.lon += resolution / 2.0;
        }

        Ok(Self {
            origin,
            resolution,
            precision: meta.filename_precision,
            bounds,
        })
    }

    /// Reject coordinates outside the published bounding box.
    pub fn check_bounds(&self, coord: Coordinate) -> DWeatherResult<()> {
        if !self.bounds.contains_lat(coord.lat) {
            return Err(DWeatherError::input_out_of_range(format!(
                "latitude {} outside [{:.3}, {:.3}]",
                coord.lat, self.bounds.min_lat, self.bounds.max_lat
            )));
        }
        if !self.bounds.contains_lon(coord.lon) {
            return Err(DWeatherError::input_out_of_range(format!(
                "longitude {} outside [{:.3}, {:.3}]",
                coord.lon, self.bounds.min_lon, self.bounds.max_lon
            )));
        }
        Ok(())
    }

    pub fn snap(&self, coord: Coordinate) -> Coordinate {
        snap(coord, self.origin, self.resolution, self.precision)
    }

    /// Bounds check followed by snap.
    pub fn locate(&self, coord: Coordinate) -> DWeatherResult<Coordinate> {
        self.check_bounds(coord)?;
        Ok(self.snap(coord))
    }
}
