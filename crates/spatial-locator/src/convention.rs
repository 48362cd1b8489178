//! Longitude conventions.
//!
//! Conventional longitudes lie in `(-180, 180]`; shifted longitudes lie in `[0, 360)`.
//! Coordinates are normalized into a dataset's convention before snapping and
//! restored to conventional before they are returned.

use serde::{Deserialize, Serialize};

use dweather_common::Coordinate;

pub fn to_shifted(coord: Coordinate) -> Coordinate {
    if coord.lon < 0.0 {
        Coordinate::new(coord.lat, coord.lon + 360.0)
    } else {
        coord
    }
}

pub fn to_conventional(coord: Coordinate) -> Coordinate {
    if coord.lon >= 180.0 {
        Coordinate::new(coord.lat, coord.lon - 360.0)
    } else {
        coord
    }
}

/// Longitude convention a dataset's metadata and shard names are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LonConvention {
    #[default]
    Conventional,
    Shifted,
}

impl LonConvention {
    /// Express a caller-supplied coordinate in this convention.
    pub fn normalize(self, coord: Coordinate) -> Coordinate {
        match self {
            LonConvention::Conventional => to_conventional(coord),
            LonConvention::Shifted => to_shifted(coord),
        }
    }

    /// Express a coordinate in this convention back in conventional longitude.
    pub fn restore(self, coord: Coordinate) -> Coordinate {
        to_conventional(coord)
    }
}
