//! Station column aliases and station display units.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use dweather_common::{DWeatherError, DWeatherResult};

/// Display unit family for station values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl std::str::FromStr for UnitSystem {
    type Err = DWeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(DWeatherError::unit(format!(
                "unknown unit system '{}' (expected metric or imperial)",
                other
            ))),
        }
    }
}

/// Metric and imperial unit of one station column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUnits {
    pub metric: String,
    pub imperial: String,
}

impl ColumnUnits {
    pub fn get(&self, system: UnitSystem) -> &str {
        match system {
            UnitSystem::Metric => &self.metric,
            UnitSystem::Imperial => &self.imperial,
        }
    }
}

/// One alias group: every spelling in `aliases` resolves to `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasGroup {
    pub aliases: Vec<String>,
    pub columns: Vec<String>,
}

const BUILTIN_ALIASES: &[(&[&str], &[&str])] = &[
    (&["SNWD", "snow depth", "snowdepth"], &["SNWD"]),
    (&["SNOW", "snow fall", "snowfall", "snow"], &["SNOW"]),
    (
        &["WESD", "snow water equivalent", "water equivalent snow depth"],
        &["WESD"],
    ),
    (
        &[
            "TMAX",
            "highs",
            "max temperature",
            "temperature max",
            "maximum temperature",
            "temperature maximum",
            "max temp",
            "temp max",
            "maximum temp",
            "temp maximum",
        ],
        &["TMAX"],
    ),
    (
        &[
            "TMIN",
            "lows",
            "min temperature",
            "temperature min",
            "minimum temperature",
            "temperature minimum",
            "min temp",
            "temp min",
            "minimum temp",
            "temp minimum",
        ],
        &["TMIN"],
    ),
    (
        &["temperature", "temperatures", "temp", "temps"],
        &["TMAX", "TMIN"],
    ),
    (
        &["PRCP", "precipitation", "precip", "rain", "rainfall"],
        &["PRCP"],
    ),
];

const BUILTIN_UNITS: &[(&str, &str, &str)] = &[
    ("PRCP", "mm", "inch"),
    ("SNWD", "mm", "inch"),
    ("SNOW", "mm", "inch"),
    ("WESD", "mm", "inch"),
    ("TMAX", "degC", "degF"),
    ("TMIN", "degC", "degF"),
];

#[derive(Debug, Deserialize)]
struct YamlAliasFile {
    #[serde(default)]
    aliases: Vec<AliasGroup>,
    #[serde(default)]
    units: HashMap<String, ColumnUnits>,
}

/// Immutable station column lookup tables.
#[derive(Debug, Clone)]
pub struct StationAliases {
    columns: HashMap<String, Vec<String>>,
    units: HashMap<String, ColumnUnits>,
}

impl Default for StationAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StationAliases {
    /// Tables for GHCN-style daily station files.
    pub fn builtin() -> Self {
        let mut columns = HashMap::new();
        for (aliases, targets) in BUILTIN_ALIASES {
            let targets: Vec<String> = targets.iter().map(|c| c.to_string()).collect();
            for alias in aliases.iter() {
                columns.insert(alias.to_string(), targets.clone());
            }
        }
        let units = BUILTIN_UNITS
            .iter()
            .map(|(column, metric, imperial)| {
                (
                    column.to_string(),
                    ColumnUnits {
                        metric: metric.to_string(),
                        imperial: imperial.to_string(),
                    },
                )
            })
            .collect();
        Self { columns, units }
    }

    /// Add or replace alias groups and column units from YAML:
    /// `aliases: [{aliases: [...], columns: [...]}]`, `units: {COL: {metric, imperial}}`.
    pub fn extend_from_yaml(mut self, yaml: &str) -> DWeatherResult<Self> {
        let file: YamlAliasFile = serde_yaml::from_str(yaml)
            .map_err(|e| DWeatherError::config(format!("station alias table: {}", e)))?;
        for group in file.aliases {
            if group.columns.is_empty() {
                return Err(DWeatherError::config(format!(
                    "alias group {:?} names no columns",
                    group.aliases
                )));
            }
            for alias in group.aliases {
                self.columns.insert(alias, group.columns.clone());
            }
        }
        self.units.extend(file.units);
        Ok(self)
    }

    /// Built-in tables extended from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> DWeatherResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DWeatherError::config(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        let aliases = Self::builtin().extend_from_yaml(&contents)?;
        info!(
            path = ?path.as_ref(),
            aliases = aliases.columns.len(),
            "Loaded station alias table"
        );
        Ok(aliases)
    }

    /// Columns an alias stands for.
    pub fn resolve(&self, alias: &str) -> DWeatherResult<&[String]> {
        self.columns
            .get(alias.trim())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                DWeatherError::unit(format!(
                    "the alias {} was not found in the station lookup",
                    alias
                ))
            })
    }

    /// Resolve several aliases, keeping first-seen column order without duplicates.
    pub fn resolve_all<S: AsRef<str>>(&self, aliases: &[S]) -> DWeatherResult<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for alias in aliases {
            for column in self.resolve(alias.as_ref())? {
                if !out.contains(column) {
                    out.push(column.clone());
                }
            }
        }
        Ok(out)
    }

    /// Units of the column an alias resolves to. Aliases for several columns are rejected.
    pub fn column_units(&self, alias: &str) -> DWeatherResult<&ColumnUnits> {
        let columns = self.resolve(alias)?;
        let [column] = columns else {
            return Err(DWeatherError::unit(format!(
                "{} names {} columns; ask for one",
                alias,
                columns.len()
            )));
        };
        self.units_of(column)
    }

    /// Units of a station column by its published name.
    pub fn units_of(&self, column: &str) -> DWeatherResult<&ColumnUnits> {
        self.units
            .get(column)
            .ok_or_else(|| DWeatherError::unit(format!("no units known for column {}", column)))
    }
}
