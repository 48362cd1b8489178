//! Dataset catalog: per-dataset variants and revision sets.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dweather_common::{Cadence, DWeatherError, DWeatherResult};
use series_assembler::{RevisionSet, RowLayout};
use spatial_locator::{ArchiveFormat, GridAnchor, LonConvention, ShardEncoding};

use crate::dataset::{DatasetDefinition, DatasetKind, GridOptions, LeadingFill};

/// Catalog file layout.
///
/// ```yaml
/// datasets:
///   cpc_us-daily:
///     kind: uniform
///     convention: shifted
/// revision_sets:
///   chirps_05:
///     revisions: [chirps_05-daily, chirps_prelim_05-daily]
///     last_final: chirps_05-daily
/// ```
#[derive(Debug, Default, Deserialize)]
struct YamlCatalog {
    #[serde(default)]
    datasets: HashMap<String, DatasetDefinition>,
    #[serde(default)]
    revision_sets: HashMap<String, YamlRevisionSet>,
}

#[derive(Debug, Deserialize)]
struct YamlRevisionSet {
    revisions: Vec<String>,
    #[serde(default)]
    last_final: Option<String>,
}

/// Dataset definitions and revision sets, immutable once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetCatalog {
    datasets: HashMap<String, DatasetDefinition>,
    revision_sets: HashMap<String, RevisionSet>,
}

impl DatasetCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Definitions of the published dataset family.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        let shifted = GridOptions {
            convention: LonConvention::Shifted,
            ..GridOptions::default()
        };
        let conventional = GridOptions::default();

        for name in [
            "chirps_05-daily",
            "chirps_25-daily",
            "chirps_prelim_05-daily",
            "chirpsc_final_05-daily",
            "chirpsc_final_25-daily",
            "chirpsc_prelim_05-daily",
        ] {
            catalog.insert(name, DatasetDefinition::new(Cadence::Daily, DatasetKind::Uniform(conventional.clone())));
        }

        for name in [
            "cpc_global-daily",
            "cpc_us-daily",
            "cpc_temp-daily",
            "cpcc_precip_us-daily",
            "cpcc_precip_global-daily",
            "cpcc_temp_max-daily",
            "cpcc_temp_min-daily",
        ] {
            catalog.insert(name, DatasetDefinition::new(Cadence::Daily, DatasetKind::Uniform(shifted.clone())));
        }

        for name in [
            "era5_land_2m_temp-hourly",
            "era5_land_precip-hourly",
            "era5_land_surface_solar_radiation_downwards-hourly",
            "era5_land_snowfall-hourly",
            "era5_surface_runoff-hourly",
            "era5_wind_100m_u-hourly",
            "era5_wind_100m_v-hourly",
            "era5_volumetric_soil_water_layer_1-hourly",
        ] {
            catalog.insert(name, DatasetDefinition::new(Cadence::Hourly, DatasetKind::Uniform(shifted.clone())));
        }

        let padded = GridOptions {
            zero_pad: Some(8),
            ..shifted.clone()
        };
        for name in ["era5_land_wind_u-hourly", "era5_land_wind_v-hourly"] {
            catalog.insert(name, DatasetDefinition::new(Cadence::Hourly, DatasetKind::Uniform(padded.clone())));
        }

        let prism = GridOptions {
            rows: RowLayout::CalendarYears,
            archived_at_root: true,
            ..conventional.clone()
        };
        let prism_origin = NaiveDate::from_ymd_opt(1981, 1, 1);
        for name in ["prismc-tmax-daily", "prismc-tmin-daily", "prismc-precip-daily"] {
            let mut def = DatasetDefinition::new(Cadence::Daily, DatasetKind::OverlapReconciled(prism.clone()));
            def.series_origin = prism_origin;
            catalog.insert(name, def);
        }

        for name in [
            "prism_precip-daily",
            "prism_precip_30_day-daily",
            "prism_precip_rev_1-daily",
            "prism_temp-daily",
            "prism_temp_30_day-daily",
            "prism_temp_rev_1-daily",
        ] {
            catalog.insert(name, DatasetDefinition::new(Cadence::Daily, DatasetKind::Uniform(conventional.clone())));
        }

        for name in [
            "rtma_dew_point-hourly",
            "rtma_gust-hourly",
            "rtma_pcp-hourly",
            "rtma_temp-hourly",
            "rtma_wind_u-hourly",
            "rtma_wind_v-hourly",
        ] {
            catalog.insert(
                name,
                DatasetDefinition::new(
                    Cadence::Hourly,
                    DatasetKind::IrregularIndexed {
                        index_path: "etc/rtma_grid.json.gz".into(),
                    },
                ),
            );
        }

        catalog.insert(
            "copernicus_fapar-daily",
            DatasetDefinition::new(
                Cadence::Daily,
                DatasetKind::Uniform(GridOptions {
                    encoding: ShardEncoding::F32,
                    archive: ArchiveFormat::Zip,
                    ..conventional.clone()
                }),
            ),
        );

        // The first VHI release is recorded as starting 1981-08-28, but its first
        // row starts on 1981-01-01 with 34 filler weeks.
        let mut vhi = DatasetDefinition::new(
            Cadence::Weekly,
            DatasetKind::Uniform(GridOptions {
                anchor: GridAnchor::CellCentre,
                rows: RowLayout::CalendarYears,
                archive: ArchiveFormat::Zip,
                archived_at_root: true,
                ..conventional.clone()
            }),
        );
        vhi.leading_fill = NaiveDate::from_ymd_opt(1981, 8, 28)
            .zip(NaiveDate::from_ymd_opt(1981, 1, 1))
            .map(|(recorded_start, row_start)| LeadingFill {
                recorded_start,
                row_start,
                values: 34,
            });
        catalog.insert("vhi", vhi);

        for (name, interval_hours) in [("gfs_10_day_forecast_temp-hourly", 6), ("gfs_10_day_forecast_precip-hourly", 6)] {
            catalog.insert(
                name,
                DatasetDefinition::new(
                    Cadence::Hours(interval_hours),
                    DatasetKind::DateWindowed {
                        interval_hours,
                        convention: LonConvention::Shifted,
                    },
                ),
            );
        }

        catalog.insert_revision_set(
            RevisionSet::new(
                "prism_precip",
                vec![
                    "prism_precip-daily".into(),
                    "prism_precip_30_day-daily".into(),
                    "prism_precip_rev_1-daily".into(),
                ],
            ),
        );
        catalog.insert_revision_set(
            RevisionSet::new(
                "prism_temp",
                vec![
                    "prism_temp-daily".into(),
                    "prism_temp_30_day-daily".into(),
                    "prism_temp_rev_1-daily".into(),
                ],
            ),
        );
        catalog.insert_revision_set(RevisionSet::new(
            "chirps_05",
            vec!["chirps_05-daily".into(), "chirps_prelim_05-daily".into()],
        ));
        for (set, dataset) in [
            ("chirps_25", "chirps_25-daily"),
            ("cpc_global", "cpc_global-daily"),
            ("cpc_us", "cpc_us-daily"),
            ("cpc_temp", "cpc_temp-daily"),
        ] {
            catalog.insert_revision_set(RevisionSet::new(set, vec![dataset.into()]));
        }

        catalog
    }

    pub fn insert(&mut self, name: &str, definition: DatasetDefinition) {
        self.datasets.insert(name.to_string(), definition);
    }

    pub fn insert_revision_set(&mut self, set: RevisionSet) {
        self.revision_sets.insert(set.name.clone(), set);
    }

    /// Add or replace entries from a YAML document.
    pub fn extend_from_yaml(mut self, yaml: &str) -> DWeatherResult<Self> {
        let file: YamlCatalog = serde_yaml::from_str(yaml)
            .map_err(|e| DWeatherError::config(format!("dataset catalog: {}", e)))?;

        for (name, definition) in file.datasets {
            if let DatasetKind::DateWindowed { interval_hours, .. } = definition.kind {
                if interval_hours == 0 {
                    return Err(DWeatherError::config(format!(
                        "{}: interval_hours must be positive",
                        name
                    )));
                }
            }
            self.datasets.insert(name, definition);
        }

        for (name, set) in file.revision_sets {
            if set.revisions.is_empty() {
                return Err(DWeatherError::config(format!(
                    "revision set {} lists no revisions",
                    name
                )));
            }
            if let Some(last) = &set.last_final {
                if !set.revisions.contains(last) {
                    return Err(DWeatherError::config(format!(
                        "revision set {}: last_final {} is not one of its revisions",
                        name, last
                    )));
                }
            }
            let mut revision_set = RevisionSet::new(name.clone(), set.revisions);
            revision_set.last_final = set.last_final;
            self.revision_sets.insert(name, revision_set);
        }

        Ok(self)
    }

    /// Built-in catalog extended from a YAML file. A missing file leaves the
    /// built-in catalog in place.
    pub fn load<P: AsRef<Path>>(path: P) -> DWeatherResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = ?path, "Catalog file does not exist, using built-in catalog");
            return Ok(Self::builtin());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DWeatherError::config(format!("reading {}: {}", path.display(), e)))?;
        let catalog = Self::builtin().extend_from_yaml(&contents)?;
        info!(
            path = ?path,
            datasets = catalog.datasets.len(),
            revision_sets = catalog.revision_sets.len(),
            "Loaded dataset catalog"
        );
        Ok(catalog)
    }

    /// Definition of a dataset; names outside the catalog are treated as plain
    /// uniform grids with the cadence their name implies.
    pub fn definition(&self, dataset: &str) -> DatasetDefinition {
        self.datasets
            .get(dataset)
            .cloned()
            .unwrap_or_else(|| DatasetDefinition::inferred(dataset))
    }

    pub fn contains(&self, dataset: &str) -> bool {
        self.datasets.contains_key(dataset)
    }

    pub fn revision_set(&self, name: &str) -> DWeatherResult<&RevisionSet> {
        self.revision_sets
            .get(name)
            .ok_or_else(|| DWeatherError::dataset(format!("no revision set named {}", name)))
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn revision_set_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.revision_sets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
