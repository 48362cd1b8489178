//! Coordinate resolution for gridded datasets.
//!
//! Turns a requested `(lat, lon)` into the grid point a dataset actually
//! publishes and the shard that holds its series:
//!
//! - [`grid`]: nearest-grid-line snapping and bounding-box checks for uniform grids
//! - [`convention`]: conventional `(-180, 180]` vs shifted `[0, 360)` longitudes
//! - [`irregular`]: bucketed nearest-neighbour lookup for non-uniform grids
//! - [`shard`]: shard file and archive naming
//! - [`proximity`]: great-circle distances for storm and station searches

pub mod convention;
pub mod grid;
pub mod irregular;
pub mod proximity;
pub mod shard;

pub use convention::{to_conventional, to_shifted, LonConvention};
pub use grid::{snap, snap_value, GridAnchor, GridSpec};
pub use irregular::{GridPoint, IrregularGrid, IrregularGridDocument, IrregularMatch};
pub use proximity::{haversine_km, n_closest, within_radius, EARTH_RADIUS_KM};
pub use shard::{
    forecast_key, irregular_member, ArchiveFormat, ShardEncoding, ShardKey, ShardNaming,
};
