//! Common types shared across the dweather crates.
//!
//! - [`DWeatherError`]: the error taxonomy every layer reports through
//! - [`Snapshot`] / [`SnapshotMetadata`]: one published revision of a dataset
//! - [`TimeSeries`] / [`Observation`]: assembled values with their published text
//! - [`Coordinate`] / [`BoundingBox`]: degree-space geometry
//! - [`DateRange`] / [`Cadence`]: coverage and sampling step

pub mod error;
pub mod geo;
pub mod numeric;
pub mod series;
pub mod snapshot;
pub mod time;

pub use error::{DWeatherError, DWeatherResult};
pub use geo::{BoundingBox, Coordinate};
pub use numeric::{decimal_places, round_to};
pub use series::{Observation, TimeSeries};
pub use snapshot::{
    MissingSentinel, Snapshot, SnapshotId, SnapshotMetadata, DEFAULT_FILENAME_PRECISION,
    METADATA_FILE,
};
pub use time::{parse_naive, parse_timestamp, Cadence, DateRange, TimeParseError};
