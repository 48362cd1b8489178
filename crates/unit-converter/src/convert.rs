//! Precision-preserving unit conversion.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use dweather_common::{
    decimal_places, round_to, DWeatherError, DWeatherResult, Observation, TimeSeries,
};

use crate::registry::{UnitDef, UnitRegistry};

/// A value with its unit and the text it was rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub raw: String,
    pub value: f64,
    pub unit: String,
}

/// Round a multiplicatively converted value to the significant figures of `raw`.
///
/// With `factor = converted / raw_value`, the result keeps
/// `decimal_places(raw) - floor(log10(factor))` decimals, so `"10"` mm shown in
/// inches keeps two decimals. A zero input yields `0.0`; non-finite inputs yield NaN.
pub fn rounding_formula(raw: &str, raw_value: f64, converted: f64) -> f64 {
    if raw_value == 0.0 {
        return 0.0;
    }
    if !raw_value.is_finite() || !converted.is_finite() {
        return f64::NAN;
    }
    let factor = (converted / raw_value).abs();
    if factor == 0.0 {
        return 0.0;
    }
    let exponent = -(factor.log10().floor() as i32);
    round_to(converted, decimal_places(raw) as i32 + exponent)
}

/// Converts values between units of one dimension.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    registry: Arc<UnitRegistry>,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(Arc::new(UnitRegistry::builtin()))
    }
}

impl UnitConverter {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    fn pair(&self, unit_from: &str, unit_to: &str) -> DWeatherResult<(UnitDef, UnitDef)> {
        let from = self.registry.lookup(unit_from)?;
        let to = self.registry.lookup(unit_to)?;
        if from.dimension != to.dimension {
            return Err(DWeatherError::unit(format!(
                "cannot convert {} ({}) to {} ({})",
                unit_from, from.dimension, unit_to, to.dimension
            )));
        }
        Ok((from, to))
    }

    /// Convert one published value.
    ///
    /// Temperatures keep the decimal count of `raw`; every other dimension goes
    /// through [`rounding_formula`].
    pub fn convert(
        &self,
        raw: &str,
        raw_value: f64,
        unit_from: &str,
        unit_to: &str,
    ) -> DWeatherResult<Quantity> {
        let (from, to) = self.pair(unit_from, unit_to)?;
        Ok(Quantity {
            raw: raw.to_string(),
            value: apply(raw, raw_value, from, to),
            unit: unit_to.trim().to_string(),
        })
    }

    /// Convert every value of a series. Missing entries stay missing.
    pub fn convert_series(
        &self,
        series: TimeSeries,
        unit_from: &str,
        unit_to: &str,
    ) -> DWeatherResult<TimeSeries> {
        let (from, to) = self.pair(unit_from, unit_to)?;
        debug!(from = unit_from, to = unit_to, points = series.len(), "Converting series");
        series.try_map_values(|raw, value| {
            let converted = apply(raw, value, from, to);
            Ok::<_, DWeatherError>(Observation::value(converted.to_string(), converted))
        })
    }
}

fn apply(raw: &str, raw_value: f64, from: UnitDef, to: UnitDef) -> f64 {
    if from == to {
        return raw_value;
    }
    let converted = to.from_si(from.to_si(raw_value));
    if from.is_affine() {
        round_to(converted, decimal_places(raw) as i32)
    } else {
        rounding_formula(raw, raw_value, converted)
    }
}
