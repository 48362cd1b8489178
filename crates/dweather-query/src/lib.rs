//! Query facade for dweather snapshot chains.
//!
//! [`QueryFacade`] resolves a dataset name to its head snapshot, walks the chain,
//! resolves the requested coordinate to a shard, assembles the per-snapshot
//! series and converts units. How each of those steps behaves for a given
//! dataset is read from the [`DatasetCatalog`].
//!
//! ```ignore
//! use dweather_query::{GriddedOptions, QueryConfig, QueryFacade};
//!
//! let facade = QueryFacade::from_config(&QueryConfig::from_env())?;
//! let response = facade
//!     .gridded_series("chirps_05-daily", 41.1842, -75.11, &GriddedOptions::default())
//!     .await?;
//! ```

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod facade;

pub use catalog::DatasetCatalog;
pub use config::QueryConfig;
pub use dataset::{DatasetDefinition, DatasetKind, GridLocator, GridOptions, ResolvedShard};
pub use facade::{
    GriddedOptions, HistoricalRainfall, PeriodRainfall, QueryFacade, RainfallOptions,
    RevisionResponse, SeriesResponse, StationColumn, StationResponse,
};
pub use series_assembler::{HistoricalOptions, PeriodTotal, HISTORICAL_START_YEAR};
