//! Unit definitions.
//!
//! Every unit is an affine map onto the SI base of its dimension:
//! `si = value * scale + offset`. Only temperature units carry an offset.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dweather_common::{DWeatherError, DWeatherResult};

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Length,
    Temperature,
    Speed,
    Pressure,
    Irradiance,
    RadiantExposure,
    Ratio,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Temperature => "temperature",
            Dimension::Speed => "speed",
            Dimension::Pressure => "pressure",
            Dimension::Irradiance => "irradiance",
            Dimension::RadiantExposure => "radiant exposure",
            Dimension::Ratio => "ratio",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub dimension: Dimension,
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl UnitDef {
    pub const fn new(dimension: Dimension, scale: f64) -> Self {
        Self {
            dimension,
            scale,
            offset: 0.0,
        }
    }

    pub const fn affine(dimension: Dimension, scale: f64, offset: f64) -> Self {
        Self {
            dimension,
            scale,
            offset,
        }
    }

    pub fn to_si(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn from_si(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    /// Whether conversions involving this unit shift the zero point.
    pub fn is_affine(&self) -> bool {
        self.dimension == Dimension::Temperature
    }
}

const BUILTIN_UNITS: &[(&[&str], UnitDef)] = &[
    // Length, metres
    (&["m", "meter", "metre", "meters", "metres"], UnitDef::new(Dimension::Length, 1.0)),
    (&["mm", "millimeter", "millimetre", "millimeters", "millimetres"], UnitDef::new(Dimension::Length, 0.001)),
    (&["cm", "centimeter", "centimetre", "centimeters", "centimetres"], UnitDef::new(Dimension::Length, 0.01)),
    (&["km", "kilometer", "kilometre", "kilometers", "kilometres"], UnitDef::new(Dimension::Length, 1000.0)),
    (&["in", "inch", "inches"], UnitDef::new(Dimension::Length, 0.0254)),
    (&["ft", "foot", "feet"], UnitDef::new(Dimension::Length, 0.3048)),
    (&["mi", "mile", "miles"], UnitDef::new(Dimension::Length, 1609.344)),
    // Temperature, kelvin
    (&["K", "kelvin"], UnitDef::affine(Dimension::Temperature, 1.0, 0.0)),
    (&["degC", "°C", "C", "celsius", "degree_Celsius"], UnitDef::affine(Dimension::Temperature, 1.0, 273.15)),
    (&["degF", "°F", "F", "fahrenheit", "degree_Fahrenheit"], UnitDef::affine(Dimension::Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0)),
    // Speed, metres per second
    (&["m s**-1", "m/s", "m s-1", "meter / second"], UnitDef::new(Dimension::Speed, 1.0)),
    (&["km/h", "km h**-1", "kph"], UnitDef::new(Dimension::Speed, 1000.0 / 3600.0)),
    (&["mph", "mi/h", "mile / hour"], UnitDef::new(Dimension::Speed, 0.44704)),
    (&["knot", "knots", "kt", "kn"], UnitDef::new(Dimension::Speed, 1852.0 / 3600.0)),
    // Pressure, pascals
    (&["Pa", "pascal"], UnitDef::new(Dimension::Pressure, 1.0)),
    (&["hPa", "hectopascal"], UnitDef::new(Dimension::Pressure, 100.0)),
    (&["kPa", "kilopascal"], UnitDef::new(Dimension::Pressure, 1000.0)),
    (&["mbar", "millibar", "mb"], UnitDef::new(Dimension::Pressure, 100.0)),
    (&["bar"], UnitDef::new(Dimension::Pressure, 100_000.0)),
    (&["inHg", "inch_Hg"], UnitDef::new(Dimension::Pressure, 3386.389)),
    // Irradiance and radiant exposure
    (&["W m**-2", "W/m^2", "W m-2", "watt / meter ** 2"], UnitDef::new(Dimension::Irradiance, 1.0)),
    (&["J m**-2", "J/m^2", "J m-2", "joule / meter ** 2"], UnitDef::new(Dimension::RadiantExposure, 1.0)),
    (&["MJ m**-2", "MJ/m^2", "MJ m-2"], UnitDef::new(Dimension::RadiantExposure, 1.0e6)),
    // Ratio
    (&["1", "fraction", "dimensionless"], UnitDef::new(Dimension::Ratio, 1.0)),
    (&["%", "percent"], UnitDef::new(Dimension::Ratio, 0.01)),
];

/// YAML layout accepted by [`UnitRegistry::extend_from_yaml`].
#[derive(Debug, Deserialize)]
struct YamlUnitFile {
    units: Vec<YamlUnit>,
}

#[derive(Debug, Deserialize)]
struct YamlUnit {
    names: Vec<String>,
    #[serde(flatten)]
    def: UnitDef,
}

/// Immutable lookup table from unit spellings to definitions.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl UnitRegistry {
    pub fn empty() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    /// Registry with the units published datasets use.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (names, def) in BUILTIN_UNITS {
            for name in names.iter() {
                registry.units.insert((*name).to_string(), *def);
            }
        }
        registry
    }

    pub fn with_unit(mut self, name: impl Into<String>, def: UnitDef) -> Self {
        self.units.insert(name.into(), def);
        self
    }

    /// Add units from a YAML document of the form
    /// `units: [{names: [...], dimension: length, scale: 0.3048}]`.
    pub fn extend_from_yaml(mut self, yaml: &str) -> DWeatherResult<Self> {
        let file: YamlUnitFile = serde_yaml::from_str(yaml)
            .map_err(|e| DWeatherError::config(format!("unit table: {}", e)))?;
        for unit in file.units {
            if !(unit.def.scale.is_finite() && unit.def.scale != 0.0) {
                return Err(DWeatherError::config(format!(
                    "unit {:?} has an unusable scale {}",
                    unit.names, unit.def.scale
                )));
            }
            for name in unit.names {
                debug!(unit = %name, dimension = %unit.def.dimension, "Registered unit");
                self.units.insert(name, unit.def);
            }
        }
        Ok(self)
    }

    /// Built-in registry extended from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> DWeatherResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DWeatherError::config(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        let registry = Self::builtin().extend_from_yaml(&contents)?;
        info!(path = ?path.as_ref(), units = registry.len(), "Loaded unit table");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit by spelling; surrounding whitespace is ignored, case is not.
    pub fn lookup(&self, name: &str) -> DWeatherResult<UnitDef> {
        self.units
            .get(name.trim())
            .copied()
            .ok_or_else(|| DWeatherError::unit(format!("unknown unit '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_aliases() {
        let registry = UnitRegistry::builtin();
        assert_eq!(registry.lookup("mm").unwrap(), registry.lookup("millimeter").unwrap());
        assert_eq!(registry.lookup(" inch ").unwrap(), registry.lookup("in").unwrap());
        assert_eq!(registry.lookup("m s**-1").unwrap().dimension, Dimension::Speed);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = UnitRegistry::builtin();
        assert!(registry.lookup("MM").is_err());
        assert!(registry.lookup("pa").is_err());
    }

    #[test]
    fn test_unknown_unit() {
        let err = UnitRegistry::builtin().lookup("furlong").unwrap_err();
        assert!(matches!(err, DWeatherError::Unit(_)));
    }

    #[test]
    fn test_temperature_affine() {
        let registry = UnitRegistry::builtin();
        let f = registry.lookup("degF").unwrap();
        let c = registry.lookup("degC").unwrap();
        assert!((c.from_si(f.to_si(212.0)) - 100.0).abs() < 1e-9);
        assert!((c.from_si(f.to_si(32.0))).abs() < 1e-9);
        assert!(f.is_affine());
    }

    #[test]
    fn test_extend_from_yaml() {
        let yaml = r#"
units:
  - names: [furlong, fur]
    dimension: length
    scale: 201.168
"#;
        let registry = UnitRegistry::builtin().extend_from_yaml(yaml).unwrap();
        let fur = registry.lookup("fur").unwrap();
        assert_eq!(fur.dimension, Dimension::Length);
        assert_eq!(fur.offset, 0.0);
    }

    #[test]
    fn test_yaml_zero_scale_rejected() {
        let yaml = "units:\n  - names: [nothing]\n    dimension: ratio\n    scale: 0\n";
        let err = UnitRegistry::builtin().extend_from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DWeatherError::Config(_)));
    }
}
