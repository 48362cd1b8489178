//! Dataset variants.
//!
//! Every gridded dataset resolves a coordinate to a shard and assembles the
//! per-snapshot partial series into one. The variant, chosen by catalog entry,
//! decides how:
//!
//! | Variant | Shard | Assembly |
//! |---------|-------|----------|
//! | `uniform` | snapped `{lat}_{lon}` | oldest to newest, later wins |
//! | `overlap_reconciled` | snapped `{lat}_{lon}` | newest to oldest, first writer wins |
//! | `irregular_indexed` | nearest `(x, y)` column | oldest to newest, later wins |
//! | `date_windowed` | `{YYYYMMDD}_{lat}_{lon}` in one snapshot | single snapshot |

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use dweather_common::{
    Cadence, Coordinate, DWeatherError, DWeatherResult, SnapshotMetadata, TimeSeries,
};
use series_assembler::{merge_forward, merge_precedence_reverse, RowLayout};
use spatial_locator::{
    forecast_key, ArchiveFormat, GridAnchor, GridSpec, IrregularGrid, LonConvention,
    ShardEncoding, ShardKey, ShardNaming,
};

/// Grid naming and payload options shared by the snapped-grid variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub convention: LonConvention,
    pub anchor: GridAnchor,
    /// Zero-pad width of the coordinate components in shard names.
    pub zero_pad: Option<usize>,
    pub encoding: ShardEncoding,
    pub rows: RowLayout,
    pub archive: ArchiveFormat,
    /// Chain roots pack shards into row archives too.
    pub archived_at_root: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetKind {
    Uniform(GridOptions),
    OverlapReconciled(GridOptions),
    IrregularIndexed {
        /// Grid index document on local disk, JSON, optionally gzip-compressed.
        index_path: PathBuf,
    },
    DateWindowed {
        interval_hours: u32,
        #[serde(default)]
        convention: LonConvention,
    },
}

impl DatasetKind {
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Uniform(_) => "uniform",
            DatasetKind::OverlapReconciled(_) => "overlap_reconciled",
            DatasetKind::IrregularIndexed { .. } => "irregular_indexed",
            DatasetKind::DateWindowed { .. } => "date_windowed",
        }
    }

    pub fn is_date_windowed(&self) -> bool {
        matches!(self, DatasetKind::DateWindowed { .. })
    }

    pub fn convention(&self) -> LonConvention {
        match self {
            DatasetKind::Uniform(opts) | DatasetKind::OverlapReconciled(opts) => opts.convention,
            DatasetKind::IrregularIndexed { .. } => LonConvention::Shifted,
            DatasetKind::DateWindowed { convention, .. } => *convention,
        }
    }

    /// Merge partial series given oldest first.
    pub fn assemble(&self, partials: Vec<TimeSeries>) -> TimeSeries {
        match self {
            DatasetKind::OverlapReconciled(_) => {
                merge_precedence_reverse(partials.into_iter().rev())
            }
            DatasetKind::Uniform(_)
            | DatasetKind::IrregularIndexed { .. }
            | DatasetKind::DateWindowed { .. } => merge_forward(partials),
        }
    }

    /// Payload encoding of this dataset's shards.
    pub fn encoding(&self) -> ShardEncoding {
        match self {
            DatasetKind::Uniform(opts) | DatasetKind::OverlapReconciled(opts) => opts.encoding,
            _ => ShardEncoding::Text,
        }
    }

    pub fn rows(&self) -> RowLayout {
        match self {
            DatasetKind::Uniform(opts) | DatasetKind::OverlapReconciled(opts) => opts.rows,
            _ => RowLayout::Continuous,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(flatten)]
    pub kind: DatasetKind,
    /// Date the first shard value belongs to, when shards do not start at the
    /// snapshot's covered range.
    #[serde(default)]
    pub series_origin: Option<NaiveDate>,
    #[serde(default)]
    pub leading_fill: Option<LeadingFill>,
}

/// Placeholder values at the head of a chain root's shard.
///
/// A root whose covered range starts on `recorded_start` actually begins its
/// first row on `row_start`, and its first `values` steps are filler that is
/// dropped from the assembled series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadingFill {
    pub recorded_start: NaiveDate,
    pub row_start: NaiveDate,
    pub values: usize,
}

impl LeadingFill {
    /// Real first-row start of `root`, when the filler applies to it.
    pub fn row_start_for(&self, root: &SnapshotMetadata) -> Option<NaiveDateTime> {
        (root.is_root() && root.covered_range.start.date() == self.recorded_start)
            .then(|| NaiveDateTime::new(self.row_start, NaiveTime::MIN))
    }

    /// Drop the filler steps from an assembled series.
    pub fn strip(&self, series: &mut TimeSeries, cadence: Cadence) {
        let step = cadence.step();
        let mut at = NaiveDateTime::new(self.row_start, NaiveTime::MIN);
        for _ in 0..self.values {
            series.remove(&at);
            at += step;
        }
    }
}

impl DatasetDefinition {
    pub fn new(cadence: Cadence, kind: DatasetKind) -> Self {
        Self {
            cadence,
            kind,
            series_origin: None,
            leading_fill: None,
        }
    }

    pub fn with_series_origin(mut self, origin: NaiveDate) -> Self {
        self.series_origin = Some(origin);
        self
    }

    /// Plain uniform grid with the cadence implied by the dataset name.
    pub fn inferred(dataset: &str) -> Self {
        Self::new(Cadence::infer(dataset), DatasetKind::Uniform(GridOptions::default()))
    }

    /// Build the coordinate resolver against the newest snapshot's metadata.
    pub fn locator(
        &self,
        head: &SnapshotMetadata,
        irregular: Option<Arc<IrregularGrid>>,
    ) -> DWeatherResult<GridLocator> {
        match &self.kind {
            DatasetKind::Uniform(opts) | DatasetKind::OverlapReconciled(opts) => {
                let spec = GridSpec::from_metadata(head, opts.anchor)?;
                let naming = ShardNaming::new(spec.precision)
                    .with_zero_pad(opts.zero_pad)
                    .with_encoding(opts.encoding)
                    .with_archive(opts.archive, opts.archived_at_root);
                Ok(GridLocator::Uniform {
                    spec,
                    naming,
                    convention: opts.convention,
                })
            }
            DatasetKind::DateWindowed { convention, .. } => {
                let spec = GridSpec::from_metadata(head, GridAnchor::Corner)?;
                Ok(GridLocator::Uniform {
                    spec,
                    naming: ShardNaming::new(spec.precision),
                    convention: *convention,
                })
            }
            DatasetKind::IrregularIndexed { .. } => irregular
                .map(GridLocator::Irregular)
                .ok_or_else(|| DWeatherError::config("irregular grid index was not loaded")),
        }
    }
}

/// A coordinate resolved to its grid point and shard.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShard {
    /// Grid point in the dataset's own convention.
    pub grid_point: Coordinate,
    /// Grid point in conventional longitude, as reported to callers.
    pub coordinate: Coordinate,
    pub key: ShardKey,
}

impl ResolvedShard {
    /// Re-key for one forecast day.
    pub fn for_forecast(&self, date: NaiveDate) -> Self {
        Self {
            key: forecast_key(date, self.grid_point),
            ..self.clone()
        }
    }
}

/// Coordinate resolution for one dataset.
#[derive(Debug, Clone)]
pub enum GridLocator {
    Uniform {
        spec: GridSpec,
        naming: ShardNaming,
        convention: LonConvention,
    },
    Irregular(Arc<IrregularGrid>),
}

impl GridLocator {
    pub fn resolve_shard(&self, coord: Coordinate) -> DWeatherResult<ResolvedShard> {
        match self {
            GridLocator::Uniform {
                spec,
                naming,
                convention,
            } => {
                let grid_point = spec.locate(convention.normalize(coord))?;
                Ok(ResolvedShard {
                    grid_point,
                    coordinate: convention.restore(grid_point),
                    key: naming.key(grid_point),
                })
            }
            GridLocator::Irregular(grid) => {
                let found = grid.locate(coord)?;
                Ok(ResolvedShard {
                    grid_point: found.point,
                    coordinate: LonConvention::Shifted.restore(found.point),
                    key: found.shard,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dweather_common::{parse_naive, Observation};

    fn partial(points: &[(&str, f64)]) -> TimeSeries {
        points
            .iter()
            .map(|(t, v)| (parse_naive(t).unwrap(), Observation::value(v.to_string(), *v)))
            .collect()
    }

    #[test]
    fn test_assemble_by_variant() {
        let older = partial(&[("2020-01-01", 1.0), ("2020-01-02", 2.0)]);
        let newer = partial(&[("2020-01-02", 20.0)]);
        let day2 = parse_naive("2020-01-02").unwrap();

        let uniform = DatasetKind::Uniform(GridOptions::default());
        let merged = uniform.assemble(vec![older.clone(), newer.clone()]);
        assert_eq!(merged.get(&day2).unwrap().as_f64(), Some(20.0));

        let reconciled = DatasetKind::OverlapReconciled(GridOptions::default());
        let merged = reconciled.assemble(vec![older, newer]);
        assert_eq!(merged.get(&day2).unwrap().as_f64(), Some(20.0));
    }

    #[test]
    fn test_definition_from_yaml() {
        let yaml = r#"
kind: uniform
cadence: hourly
convention: shifted
zero_pad: 8
"#;
        let def: DatasetDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.cadence, Cadence::Hourly);
        match def.kind {
            DatasetKind::Uniform(opts) => {
                assert_eq!(opts.convention, LonConvention::Shifted);
                assert_eq!(opts.zero_pad, Some(8));
                assert_eq!(opts.encoding, ShardEncoding::Text);
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn test_archive_options_from_yaml() {
        let yaml = "kind: overlap_reconciled\narchive: zip\narchived_at_root: true\n";
        let def: DatasetDefinition = serde_yaml::from_str(yaml).unwrap();
        let DatasetKind::OverlapReconciled(opts) = def.kind else {
            panic!("unexpected variant");
        };
        assert_eq!(opts.archive, ArchiveFormat::Zip);
        assert!(opts.archived_at_root);
    }

    #[test]
    fn test_leading_fill_applies_to_matching_root_only() {
        let fill = LeadingFill {
            recorded_start: NaiveDate::from_ymd_opt(1981, 8, 28).unwrap(),
            row_start: NaiveDate::from_ymd_opt(1981, 1, 1).unwrap(),
            values: 2,
        };
        let root = SnapshotMetadata::from_json(
            br#"{"date range": ["1981-08-28", "1982-01-08"], "time generated": "2021-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(fill.row_start_for(&root), Some(parse_naive("1981-01-01").unwrap()));

        let later = SnapshotMetadata::from_json(
            br#"{"date range": ["1981-08-28", "1982-01-08"], "time generated": "2021-01-01T00:00:00", "previous hash": "h0"}"#,
        )
        .unwrap();
        assert_eq!(fill.row_start_for(&later), None);

        let mut series = partial(&[("1981-01-01", 1.0), ("1981-01-08", 2.0), ("1981-01-15", 3.0)]);
        fill.strip(&mut series, Cadence::Weekly);
        assert_eq!(series.len(), 1);
        assert!(series.contains(&parse_naive("1981-01-15").unwrap()));
    }

    #[test]
    fn test_date_windowed_from_yaml() {
        let yaml = "kind: date_windowed\ninterval_hours: 6\nconvention: shifted\n";
        let def: DatasetDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.kind.is_date_windowed());
        assert_eq!(def.kind.convention(), LonConvention::Shifted);
    }

    #[test]
    fn test_inferred_cadence() {
        assert_eq!(DatasetDefinition::inferred("era5_land_precip-hourly").cadence, Cadence::Hourly);
        assert_eq!(DatasetDefinition::inferred("chirps_05-daily").cadence, Cadence::Daily);
    }
}
