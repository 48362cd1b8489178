//! Unit conversion for dweather values.
//!
//! Conversions keep the precision the publisher chose: a value published as
//! `"10"` mm is shown as `0.39` inches, not `0.3937007874015748`. Unit spellings
//! and station column names resolve through immutable tables injected at
//! construction ([`UnitRegistry`], [`StationAliases`]).

pub mod aliases;
pub mod convert;
pub mod registry;

pub use aliases::{AliasGroup, ColumnUnits, StationAliases, UnitSystem};
pub use convert::{rounding_formula, Quantity, UnitConverter};
pub use registry::{Dimension, UnitDef, UnitRegistry};
