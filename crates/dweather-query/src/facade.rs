//! Query operations over snapshot chains.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use chain_index::ChainIndex;
use content_store::archive::{archive_member, maybe_gunzip};
use content_store::{CachedContentStore, ContentStore, HeadRegistry, ObjectContentStore};
use dweather_common::{
    decimal_places, Cadence, Coordinate, DWeatherError, DWeatherResult, Observation, Snapshot,
    SnapshotId, TimeSeries, METADATA_FILE,
};
use series_assembler::{
    covered_end, historical_totals, merge_revision_set, parse_f32_shard, parse_text_shard,
    sum_period, HistoricalOptions, PeriodTotal, SeriesSource, ShardLayout,
};
use spatial_locator::{n_closest, within_radius, IrregularGrid, ShardEncoding, ShardKey};
use unit_converter::{StationAliases, UnitConverter, UnitRegistry, UnitSystem};

use crate::catalog::DatasetCatalog;
use crate::config::QueryConfig;
use crate::dataset::{DatasetDefinition, DatasetKind};

const STORM_HISTORY_FILE: &str = "history.json.gz";

/// Options for [`QueryFacade::gridded_series`].
#[derive(Debug, Clone, Default)]
pub struct GriddedOptions {
    /// Only consider snapshots generated at or before this instant.
    pub as_of: Option<DateTime<Utc>>,
    /// Convert values into this unit.
    pub unit: Option<String>,
}

/// A series at one resolved grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesResponse {
    pub dataset: String,
    /// Grid point the series belongs to, in conventional longitude.
    pub coordinate: Coordinate,
    pub unit: Option<String>,
    pub series: TimeSeries,
}

/// A series reconciled across a revision set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionResponse {
    pub set: String,
    /// The coordinate as requested; each revision snaps it to its own grid.
    pub coordinate: Coordinate,
    pub unit: Option<String>,
    pub series: TimeSeries,
    pub is_final: bool,
    /// Revision that supplied each timestamp.
    pub provenance: BTreeMap<NaiveDateTime, String>,
}

/// One station column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationColumn {
    pub column: String,
    pub unit: String,
    pub series: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationResponse {
    pub dataset: String,
    pub station: String,
    pub columns: Vec<StationColumn>,
}

/// Options for the rainfall totals.
#[derive(Debug, Clone, Default)]
pub struct RainfallOptions {
    /// Largest value counted for any one day.
    pub daily_cap: Option<f64>,
    /// Treat the dataset name as a revision set and fill the period with
    /// preliminary revisions where final data ends.
    pub use_prelim: bool,
    /// Least accurate revision still counted as final.
    pub final_rev: Option<String>,
}

/// Rainfall total over one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRainfall {
    pub dataset: String,
    pub coordinate: Coordinate,
    pub start: NaiveDate,
    /// Last day summed; earlier than requested when preliminary data runs out.
    pub end: NaiveDate,
    pub total: f64,
    pub days: usize,
    pub is_final: bool,
}

/// Rainfall totals of one period repeated in each historical year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRainfall {
    pub dataset: String,
    pub coordinate: Coordinate,
    /// Keyed by the year each period starts in; `None` for years with missing days.
    pub years: BTreeMap<i32, Option<PeriodTotal>>,
    pub is_final: bool,
}

/// Read-only entry point composing chain traversal, coordinate resolution,
/// series assembly and unit conversion.
pub struct QueryFacade {
    store: Arc<dyn ContentStore>,
    heads: Arc<dyn HeadRegistry>,
    catalog: Arc<DatasetCatalog>,
    converter: UnitConverter,
    aliases: Arc<StationAliases>,
    irregular: Mutex<HashMap<PathBuf, Arc<IrregularGrid>>>,
}

impl QueryFacade {
    pub fn new(
        store: Arc<dyn ContentStore>,
        heads: Arc<dyn HeadRegistry>,
        catalog: DatasetCatalog,
    ) -> Self {
        Self {
            store,
            heads,
            catalog: Arc::new(catalog),
            converter: UnitConverter::default(),
            aliases: Arc::new(StationAliases::builtin()),
            irregular: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_units(mut self, registry: UnitRegistry) -> Self {
        self.converter = UnitConverter::new(Arc::new(registry));
        self
    }

    pub fn with_aliases(mut self, aliases: StationAliases) -> Self {
        self.aliases = Arc::new(aliases);
        self
    }

    /// Facade over the HTTP gateway, with snapshot metadata cached in memory.
    pub fn from_config(config: &QueryConfig) -> DWeatherResult<Self> {
        config.validate()?;

        let gateway = Arc::new(ObjectContentStore::http(&config.store)?);
        let store = Arc::new(CachedContentStore::new(
            gateway.clone(),
            config.store.metadata_cache_entries,
        ));

        let catalog = match &config.catalog_path {
            Some(path) => DatasetCatalog::load(path)?,
            None => DatasetCatalog::builtin(),
        };

        let mut facade = Self::new(store, gateway, catalog);
        if let Some(path) = &config.unit_table_path {
            facade = facade.with_units(UnitRegistry::load(path)?);
        }
        if let Some(path) = &config.alias_table_path {
            facade = facade.with_aliases(StationAliases::load(path)?);
        }

        info!(gateway = %config.store.gateway_url, "Query facade ready");
        Ok(facade)
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    /// Full series of a gridded dataset at one coordinate.
    #[instrument(skip(self, options), fields(as_of = ?options.as_of))]
    pub async fn gridded_series(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        options: &GriddedOptions,
    ) -> DWeatherResult<SeriesResponse> {
        metrics::counter!("dweather_queries_total", "op" => "gridded").increment(1);

        let def = self.catalog.definition(dataset);
        if def.kind.is_date_windowed() {
            return Err(DWeatherError::dataset(format!(
                "{} is published per forecast date; query it with a forecast date",
                dataset
            )));
        }

        let head = self.heads.head_of(dataset).await?;
        let chain = ChainIndex::new(self.store.as_ref());
        let snapshots = match options.as_of {
            Some(cutoff) => chain.walk_as_of(&head, cutoff).await?,
            None => chain.walk(&head).await?,
        };
        let Some(newest) = snapshots.last() else {
            return Err(DWeatherError::date_out_of_range(format!(
                "no snapshot of {} was generated at or before {:?}",
                dataset, options.as_of
            )));
        };

        let irregular = match &def.kind {
            DatasetKind::IrregularIndexed { index_path } => {
                Some(self.irregular_grid(index_path).await?)
            }
            _ => None,
        };
        let resolved = def
            .locator(&newest.metadata, irregular)?
            .resolve_shard(Coordinate::new(lat, lon))?;
        debug!(shard = %resolved.key, grid_point = %resolved.grid_point, "Resolved shard");

        let mut partials = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            partials.push(self.snapshot_series(snapshot, &resolved.key, &def).await?);
        }
        let mut series = def.kind.assemble(partials);
        if let (Some(fill), Some(oldest)) = (&def.leading_fill, snapshots.first()) {
            if fill.row_start_for(&oldest.metadata).is_some() {
                fill.strip(&mut series, def.cadence);
            }
        }

        let native = newest.metadata.native_unit.clone();
        let (series, unit) = self.convert(series, native, options.unit.as_deref())?;

        info!(
            snapshots = snapshots.len(),
            points = series.len(),
            "Assembled gridded series"
        );
        Ok(SeriesResponse {
            dataset: dataset.to_string(),
            coordinate: resolved.coordinate,
            unit,
            series,
        })
    }

    /// Forecast issued for `forecast_date` at one coordinate.
    #[instrument(skip(self))]
    pub async fn forecast_series(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        forecast_date: NaiveDate,
        unit: Option<&str>,
    ) -> DWeatherResult<SeriesResponse> {
        metrics::counter!("dweather_queries_total", "op" => "forecast").increment(1);

        let def = self.catalog.definition(dataset);
        let &DatasetKind::DateWindowed { interval_hours, .. } = &def.kind else {
            return Err(DWeatherError::dataset(format!(
                "{} is not a forecast dataset",
                dataset
            )));
        };

        let head = self.heads.head_of(dataset).await?;
        let head_meta = self.store.get_metadata(&head).await?;
        let resolved = def
            .locator(&head_meta, None)?
            .resolve_shard(Coordinate::new(lat, lon))?
            .for_forecast(forecast_date);

        let snapshot = ChainIndex::new(self.store.as_ref())
            .resolve_for_date(&head, forecast_date)
            .await?;

        let payload = self.read_shard(&snapshot, &resolved.key).await?;
        let start = NaiveDateTime::new(forecast_date, NaiveTime::MIN);
        let layout = ShardLayout::new(start, Cadence::Hours(interval_hours))
            .with_sentinel(snapshot.metadata.missing_sentinel.clone());
        let series = decode_shard(&payload, ShardEncoding::Text, &layout)?;

        let native = snapshot.metadata.native_unit.clone();
        let (series, unit) = self.convert(series, native, unit)?;

        Ok(SeriesResponse {
            dataset: dataset.to_string(),
            coordinate: resolved.coordinate,
            unit,
            series,
        })
    }

    /// Series reconciled across a named revision set, most accurate revision first.
    #[instrument(skip(self))]
    pub async fn revision_series(
        &self,
        set: &str,
        lat: f64,
        lon: f64,
        desired_end: Option<NaiveDate>,
        last_final: Option<&str>,
        unit: Option<&str>,
    ) -> DWeatherResult<RevisionResponse> {
        metrics::counter!("dweather_queries_total", "op" => "revision").increment(1);

        let set = self.catalog.revision_set(set)?.clone();
        let coordinate = Coordinate::new(lat, lon);
        let merged = merge_revision_set(self, &set, coordinate, desired_end, last_final).await?;

        let (series, unit) = match unit {
            Some(target) => {
                let native = match set.revisions.first() {
                    Some(most_accurate) => self.native_unit(most_accurate).await?,
                    None => None,
                };
                self.convert(merged.series, native, Some(target))?
            }
            None => (merged.series, None),
        };

        let provenance = merged
            .provenance
            .into_iter()
            .filter_map(|(at, index)| set.revisions.get(index).map(|name| (at, name.clone())))
            .collect();

        info!(consulted = merged.consulted, is_final = merged.is_final, "Merged revision set");
        Ok(RevisionResponse {
            set: set.name,
            coordinate,
            unit,
            series,
            is_final: merged.is_final,
            provenance,
        })
    }

    /// Station columns from `{head}/{station}.csv.gz`.
    ///
    /// Values are published in tenths of millimetres or tenths of degrees Celsius;
    /// empty cells are skipped.
    #[instrument(skip(self, columns))]
    pub async fn station_series<S: AsRef<str> + Sync>(
        &self,
        dataset: &str,
        station: &str,
        columns: &[S],
        system: UnitSystem,
    ) -> DWeatherResult<StationResponse> {
        metrics::counter!("dweather_queries_total", "op" => "station").increment(1);

        let wanted = self.aliases.resolve_all(columns)?;
        let head = self.heads.head_of(dataset).await?;
        let path = format!("{}.csv.gz", station);
        let bytes = match self.store.get_bytes(&head, &path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(DWeatherError::coordinate_not_found(format!(
                    "station {} is not published in {}",
                    station, dataset
                )))
            }
            Err(e) => return Err(e),
        };
        let csv_bytes = maybe_gunzip(&bytes)?;

        let parsed = parse_station_csv(&csv_bytes, &wanted)?;

        let mut out = Vec::with_capacity(parsed.len());
        for (column, series) in wanted.into_iter().zip(parsed) {
            let units = self.aliases.units_of(&column)?;
            let series = match system {
                UnitSystem::Metric => series,
                UnitSystem::Imperial => {
                    self.converter
                        .convert_series(series, &units.metric, &units.imperial)?
                }
            };
            out.push(StationColumn {
                unit: units.get(system).to_string(),
                column,
                series,
            });
        }

        Ok(StationResponse {
            dataset: dataset.to_string(),
            station: station.to_string(),
            columns: out,
        })
    }

    /// GeoJSON feature collection of every snapshot's storm history, oldest first.
    #[instrument(skip(self))]
    pub async fn storm_history(&self, dataset: &str, basin: Option<&str>) -> DWeatherResult<Value> {
        metrics::counter!("dweather_queries_total", "op" => "storms").increment(1);

        let head = self.heads.head_of(dataset).await?;
        let snapshots = ChainIndex::new(self.store.as_ref()).walk(&head).await?;

        let mut collection: Option<Value> = None;
        for snapshot in &snapshots {
            let bytes = match self.store.get_bytes(&snapshot.id, STORM_HISTORY_FILE).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_not_found() => {
                    return Err(DWeatherError::dataset(format!(
                        "snapshot {} has no {}",
                        snapshot.id, STORM_HISTORY_FILE
                    )))
                }
                Err(e) => return Err(e),
            };
            let release: Value = serde_json::from_slice(&maybe_gunzip(&bytes)?)?;
            let features = feature_list(&release, &snapshot.id)?.clone();

            match collection.as_mut() {
                None => collection = Some(release),
                Some(acc) => {
                    if let Some(Value::Array(existing)) = acc.get_mut("features") {
                        existing.extend(features);
                    }
                }
            }
        }

        let mut collection = collection.unwrap_or_else(|| {
            serde_json::json!({ "type": "FeatureCollection", "features": [] })
        });
        if let Some(basin) = basin {
            if let Some(Value::Array(features)) = collection.get_mut("features") {
                features.retain(|f| {
                    f.pointer("/properties/BASIN").and_then(Value::as_str) == Some(basin)
                });
            }
        }
        Ok(collection)
    }

    /// Rainfall summed over `[start, end]`.
    #[instrument(skip(self, options))]
    pub async fn period_rainfall(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
        options: &RainfallOptions,
    ) -> DWeatherResult<PeriodRainfall> {
        metrics::counter!("dweather_queries_total", "op" => "rainfall").increment(1);

        let (series, coordinate, is_final) =
            self.rainfall_series(dataset, lat, lon, end, options).await?;
        let end = covered_end(&series, end, is_final);
        let PeriodTotal { total, days } = sum_period(&series, start, end, options.daily_cap)?;

        Ok(PeriodRainfall {
            dataset: dataset.to_string(),
            coordinate,
            start,
            end,
            total,
            days,
            is_final,
        })
    }

    /// Rainfall over the period `[start, end]` in every year of `history`.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, options, history))]
    pub async fn historical_rainfall(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
        options: &RainfallOptions,
        history: &HistoricalOptions,
    ) -> DWeatherResult<HistoricalRainfall> {
        metrics::counter!("dweather_queries_total", "op" => "historical_rainfall").increment(1);

        let (series, coordinate, is_final) =
            self.rainfall_series(dataset, lat, lon, end, options).await?;
        let end = covered_end(&series, end, is_final);
        let years = historical_totals(&series, start, end, options.daily_cap, history)?;

        Ok(HistoricalRainfall {
            dataset: dataset.to_string(),
            coordinate,
            years,
            is_final,
        })
    }

    /// Storm history features strictly within `radius_km` of a point.
    #[instrument(skip(self))]
    pub async fn nearby_storms(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        radius_km: f64,
        basin: Option<&str>,
    ) -> DWeatherResult<Value> {
        let centre = Coordinate::new(lat, lon);
        let mut collection = self.storm_history(dataset, basin).await?;
        if let Some(Value::Array(features)) = collection.get_mut("features") {
            features.retain(|f| {
                feature_coordinate(f).is_some_and(|p| within_radius(centre, p, radius_km))
            });
        }
        Ok(collection)
    }

    /// Ids of the `n` stations nearest a point, nearest first, from the station
    /// list in the head snapshot's metadata.
    #[instrument(skip(self))]
    pub async fn closest_stations(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        n: usize,
    ) -> DWeatherResult<Vec<String>> {
        metrics::counter!("dweather_queries_total", "op" => "closest_stations").increment(1);

        let head = self.heads.head_of(dataset).await?;
        let bytes = self.store.get_bytes(&head, METADATA_FILE).await?;
        let doc: Value = serde_json::from_slice(&bytes)?;
        let features = doc
            .pointer("/stations/features")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DWeatherError::dataset(format!("{} publishes no station list", dataset))
            })?;

        let mut stations = Vec::with_capacity(features.len());
        for feature in features {
            let id = feature
                .pointer("/properties/station id")
                .and_then(Value::as_str)
                .ok_or_else(|| DWeatherError::data_malformed("station feature without an id"))?;
            let coord = feature_coordinate(feature).ok_or_else(|| {
                DWeatherError::data_malformed(format!("station {} has no coordinates", id))
            })?;
            stations.push((coord, id.to_string()));
        }

        debug!(stations = stations.len(), "Ranking stations");
        Ok(n_closest(Coordinate::new(lat, lon), stations, n))
    }

    /// Snapshots of a dataset, oldest first.
    #[instrument(skip(self))]
    pub async fn snapshots(
        &self,
        dataset: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> DWeatherResult<Vec<Snapshot>> {
        let head = self.heads.head_of(dataset).await?;
        let chain = ChainIndex::new(self.store.as_ref());
        match as_of {
            Some(cutoff) => chain.walk_as_of(&head, cutoff).await,
            None => chain.walk(&head).await,
        }
    }

    /// Daily rainfall for the totals, with whether all of it is final.
    async fn rainfall_series(
        &self,
        dataset: &str,
        lat: f64,
        lon: f64,
        end: NaiveDate,
        options: &RainfallOptions,
    ) -> DWeatherResult<(TimeSeries, Coordinate, bool)> {
        if options.use_prelim {
            let merged = self
                .revision_series(dataset, lat, lon, Some(end), options.final_rev.as_deref(), None)
                .await?;
            return Ok((merged.series, merged.coordinate, merged.is_final));
        }
        let response = self
            .gridded_series(dataset, lat, lon, &GriddedOptions::default())
            .await?;
        Ok((response.series, response.coordinate, true))
    }

    async fn native_unit(&self, dataset: &str) -> DWeatherResult<Option<String>> {
        let head = self.heads.head_of(dataset).await?;
        Ok(self.store.get_metadata(&head).await?.native_unit)
    }

    fn convert(
        &self,
        series: TimeSeries,
        native: Option<String>,
        target: Option<&str>,
    ) -> DWeatherResult<(TimeSeries, Option<String>)> {
        match (target, native) {
            (None, native) => Ok((series, native)),
            (Some(to), Some(from)) => {
                let series = self.converter.convert_series(series, &from, to)?;
                Ok((series, Some(to.trim().to_string())))
            }
            (Some(to), None) => Err(DWeatherError::unit(format!(
                "dataset declares no unit to convert into {}",
                to
            ))),
        }
    }

    async fn irregular_grid(&self, path: &Path) -> DWeatherResult<Arc<IrregularGrid>> {
        let mut grids = self.irregular.lock().await;
        if let Some(grid) = grids.get(path) {
            return Ok(grid.clone());
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DWeatherError::config(format!("reading grid index {}: {}", path.display(), e))
        })?;
        let grid = Arc::new(IrregularGrid::from_json(&maybe_gunzip(&bytes)?)?);
        info!(path = ?path, "Loaded irregular grid index");
        grids.insert(path.to_path_buf(), grid.clone());
        Ok(grid)
    }

    /// Shard bytes: chain roots usually hold shards as top-level files, later
    /// snapshots inside a row archive. The fallback archive is read only when the
    /// primary one does not exist.
    async fn read_shard(&self, snapshot: &Snapshot, key: &ShardKey) -> DWeatherResult<Vec<u8>> {
        if key.reads_directly(snapshot.is_root()) {
            return match self.store.get_bytes(&snapshot.id, &key.member).await {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(e) if e.is_not_found() => Err(DWeatherError::coordinate_not_found(format!(
                    "snapshot {} has no shard file {}",
                    snapshot.id, key.member
                ))),
                Err(e) => Err(e),
            };
        }

        for archive in key.archives() {
            let bytes = match self.store.get_bytes(&snapshot.id, archive).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_not_found() => {
                    debug!(snapshot = %snapshot.id, archive, "Archive absent");
                    continue;
                }
                Err(e) => return Err(e),
            };
            return archive_member(archive, &bytes, &key.member)?.ok_or_else(|| {
                DWeatherError::coordinate_not_found(format!(
                    "archive {} of snapshot {} has no member {}",
                    archive, snapshot.id, key.member
                ))
            });
        }

        Err(DWeatherError::coordinate_not_found(format!(
            "snapshot {} has no archive {}",
            snapshot.id,
            key.archives().collect::<Vec<_>>().join(" or ")
        )))
    }

    async fn snapshot_series(
        &self,
        snapshot: &Snapshot,
        key: &ShardKey,
        def: &DatasetDefinition,
    ) -> DWeatherResult<TimeSeries> {
        let payload = self.read_shard(snapshot, key).await?;
        let mut layout =
            ShardLayout::for_snapshot(&snapshot.metadata, def.cadence).with_rows(def.kind.rows());
        if let Some(origin) = def.series_origin {
            layout = layout.starting_at(NaiveDateTime::new(origin, NaiveTime::MIN));
        }
        if let Some(start) = def
            .leading_fill
            .as_ref()
            .and_then(|fill| fill.row_start_for(&snapshot.metadata))
        {
            layout = layout.starting_at(start);
        }
        let series = decode_shard(&payload, def.kind.encoding(), &layout)?;
        debug!(snapshot = %snapshot.id, points = series.len(), "Read shard");
        Ok(series)
    }
}

#[async_trait]
impl SeriesSource for QueryFacade {
    async fn fetch_series(&self, dataset: &str, coord: Coordinate) -> DWeatherResult<TimeSeries> {
        let response = self
            .gridded_series(dataset, coord.lat, coord.lon, &GriddedOptions::default())
            .await?;
        Ok(response.series)
    }
}

fn decode_shard(
    payload: &[u8],
    encoding: ShardEncoding,
    layout: &ShardLayout,
) -> DWeatherResult<TimeSeries> {
    match encoding {
        ShardEncoding::Text => {
            let bytes = maybe_gunzip(payload)?;
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| DWeatherError::data_malformed(format!("shard is not UTF-8: {}", e)))?;
            parse_text_shard(text, layout)
        }
        ShardEncoding::F32 => parse_f32_shard(payload, layout),
    }
}

fn feature_list<'a>(release: &'a Value, id: &SnapshotId) -> DWeatherResult<&'a Vec<Value>> {
    release
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DWeatherError::data_malformed(format!(
                "{} of snapshot {} has no feature list",
                STORM_HISTORY_FILE, id
            ))
        })
}

/// Point geometry of a GeoJSON feature, stored `[lat, lon]`. Numbers may be
/// published as strings.
fn feature_coordinate(feature: &Value) -> Option<Coordinate> {
    let coords = feature.pointer("/geometry/coordinates")?.as_array()?;
    let number = |v: &Value| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok());
    Some(Coordinate::new(number(coords.first()?)?, number(coords.get(1)?)?))
}

/// One series per requested column, values scaled from tenths.
fn parse_station_csv(bytes: &[u8], columns: &[String]) -> DWeatherResult<Vec<TimeSeries>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| DWeatherError::data_malformed(format!("station header: {}", e)))?
        .clone();

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let date_col = position("DATE")
        .ok_or_else(|| DWeatherError::data_malformed("station file has no DATE column"))?;
    let data_cols = columns
        .iter()
        .map(|c| {
            position(c).ok_or_else(|| {
                DWeatherError::dataset(format!("station file has no {} column", c))
            })
        })
        .collect::<DWeatherResult<Vec<_>>>()?;

    let mut out = vec![TimeSeries::new(); columns.len()];
    for record in reader.records() {
        let record =
            record.map_err(|e| DWeatherError::data_malformed(format!("station row: {}", e)))?;
        let date_text = record.get(date_col).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").map_err(|e| {
            DWeatherError::data_malformed(format!("station date '{}': {}", date_text, e))
        })?;
        let at = NaiveDateTime::new(date, NaiveTime::MIN);

        for (series, &col) in out.iter_mut().zip(&data_cols) {
            let cell = record.get(col).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            series.insert(at, from_tenths(cell)?);
        }
    }
    Ok(out)
}

fn from_tenths(cell: &str) -> DWeatherResult<Observation> {
    let tenths: f64 = cell
        .parse()
        .map_err(|_| DWeatherError::data_malformed(format!("station value '{}'", cell)))?;
    let value = tenths / 10.0;
    let decimals = decimal_places(cell) as usize + 1;
    Ok(Observation::value(format!("{:.*}", decimals, value), value))
}
