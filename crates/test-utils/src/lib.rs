//! Shared test utilities for the dweather workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Metadata document builders
//! - In-memory snapshot chains on a real [`content_store::ObjectContentStore`]
//! - Shard payload generators (text, float32, gzip, tar, zip)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then build a chain in a test:
//!
//! ```ignore
//! use test_utils::{MetadataBuilder, TestStore};
//!
//! let mut store = TestStore::new();
//! store.chain("chirps_05-daily", vec![
//!     ("h1", MetadataBuilder::new("2020-01-01", "2020-01-31")),
//!     ("h2", MetadataBuilder::new("2020-02-01", "2020-02-29")),
//! ]).await;
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.3937_f64, 0.39_f64, 0.01_f64); // passes
/// assert_approx_eq!(25.4_f64, 25.0_f64, 0.001_f64);  // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of a `Coordinate` against a `(lat, lon)` pair.
///
/// ```ignore
/// use test_utils::assert_coord_approx_eq;
///
/// assert_coord_approx_eq!(snapped, (41.175, -75.125), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_coord_approx_eq {
    ($coord:expr, ($lat:expr, $lon:expr), $epsilon:expr) => {{
        let coord = $coord;
        $crate::assert_approx_eq!(coord.lat, $lat, $epsilon);
        $crate::assert_approx_eq!(coord.lon, $lon, $epsilon);
    }};
}
