//! Revision-set reconciliation against an in-memory series source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dweather_common::{Coordinate, DWeatherError, DWeatherResult, Observation, TimeSeries};
use series_assembler::{
    is_revision_final, merge_precedence_reverse, merge_revision_set, RevisionSet, SeriesSource,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, d).unwrap()
}

fn at(d: u32) -> NaiveDateTime {
    day(d).and_hms_opt(0, 0, 0).unwrap()
}

fn series(points: &[(u32, f64)]) -> TimeSeries {
    points
        .iter()
        .map(|(d, v)| (at(*d), Observation::value(v.to_string(), *v)))
        .collect()
}

/// Fixed series per dataset name, counting fetches.
struct MapSource {
    data: HashMap<String, TimeSeries>,
    fetches: AtomicUsize,
}

impl MapSource {
    fn new(entries: Vec<(&str, TimeSeries)>) -> Self {
        Self {
            data: entries
                .into_iter()
                .map(|(name, s)| (name.to_string(), s))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesSource for MapSource {
    async fn fetch_series(&self, dataset: &str, _coord: Coordinate) -> DWeatherResult<TimeSeries> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.data
            .get(dataset)
            .cloned()
            .ok_or_else(|| DWeatherError::dataset(format!("{} not found on server", dataset)))
    }
}

fn two_revision_set() -> (RevisionSet, MapSource) {
    let set = RevisionSet::new("rain", vec!["accurate".into(), "prelim".into()]);
    let source = MapSource::new(vec![
        ("accurate", series(&[(1, 10.0)])),
        ("prelim", series(&[(1, 8.0), (2, 5.0)])),
    ]);
    (set, source)
}

const COORD: Coordinate = Coordinate {
    lat: 41.175,
    lon: -75.125,
};

// ============================================================================
// Precedence
// ============================================================================

#[tokio::test]
async fn test_accurate_value_kept_and_gap_filled() {
    let (set, source) = two_revision_set();
    let merged = merge_revision_set(&source, &set, COORD, Some(day(2)), None)
        .await
        .unwrap();

    assert_eq!(merged.series.get(&at(1)).unwrap().as_f64(), Some(10.0));
    assert_eq!(merged.series.get(&at(2)).unwrap().as_f64(), Some(5.0));
    assert_eq!(merged.provenance[&at(1)], 0);
    assert_eq!(merged.provenance[&at(2)], 1);
}

#[tokio::test]
async fn test_lowest_index_wins_everywhere() {
    let set = RevisionSet::new("rain", vec!["r0".into(), "r1".into(), "r2".into()]);
    let source = MapSource::new(vec![
        ("r0", series(&[(1, 1.0), (3, 3.0)])),
        ("r1", series(&[(1, 11.0), (2, 12.0), (3, 13.0), (4, 14.0)])),
        ("r2", series(&[(2, 22.0), (4, 24.0), (5, 25.0)])),
    ]);
    let merged = merge_revision_set(&source, &set, COORD, None, None).await.unwrap();

    let expected = [(1, 1.0), (2, 12.0), (3, 3.0), (4, 14.0), (5, 25.0)];
    assert_eq!(merged.series.len(), expected.len());
    for (d, v) in expected {
        assert_eq!(merged.series.get(&at(d)).unwrap().as_f64(), Some(v), "day {}", d);
    }
}

#[tokio::test]
async fn test_matches_first_writer_merge() {
    let set = RevisionSet::new("rain", vec!["r0".into(), "r1".into()]);
    let r0 = series(&[(1, 1.0), (4, 4.0)]);
    let r1 = series(&[(1, 9.0), (2, 9.0), (4, 9.0)]);
    let source = MapSource::new(vec![("r0", r0.clone()), ("r1", r1.clone())]);

    let merged = merge_revision_set(&source, &set, COORD, None, None).await.unwrap();
    assert_eq!(merged.series, merge_precedence_reverse(vec![r0, r1]));
}

// ============================================================================
// Finality
// ============================================================================

#[tokio::test]
async fn test_final_when_boundary_covers_supplier() {
    let (set, source) = two_revision_set();
    let merged = merge_revision_set(&source, &set, COORD, Some(day(2)), Some("prelim"))
        .await
        .unwrap();
    assert!(merged.is_final);
}

#[tokio::test]
async fn test_not_final_when_end_comes_from_past_boundary() {
    let (set, source) = two_revision_set();
    let merged = merge_revision_set(&source, &set, COORD, Some(day(2)), Some("accurate"))
        .await
        .unwrap();
    assert!(!merged.is_final);
    assert_eq!(merged.series.len(), 2);
}

#[tokio::test]
async fn test_early_stop() {
    let (set, source) = two_revision_set();
    let merged = merge_revision_set(&source, &set, COORD, Some(day(1)), Some("accurate"))
        .await
        .unwrap();
    assert!(merged.is_final);
    assert_eq!(merged.consulted, 1);
    assert_eq!(source.fetches(), 1);
    assert!(!merged.series.contains(&at(2)));
}

#[tokio::test]
async fn test_exhausted_without_end_is_not_final() {
    let (set, source) = two_revision_set();
    let merged = merge_revision_set(&source, &set, COORD, Some(day(9)), None)
        .await
        .unwrap();
    assert!(!merged.is_final);
    assert_eq!(merged.series.len(), 2);
    assert_eq!(merged.consulted, 2);
}

#[tokio::test]
async fn test_no_desired_end_uses_provenance() {
    let (set, source) = two_revision_set();

    let merged = merge_revision_set(&source, &set, COORD, None, Some("accurate"))
        .await
        .unwrap();
    assert!(!merged.is_final);

    let merged = merge_revision_set(&source, &set, COORD, None, Some("prelim"))
        .await
        .unwrap();
    assert!(merged.is_final);
}

#[tokio::test]
async fn test_set_default_boundary() {
    let (set, source) = two_revision_set();
    let set = set.with_last_final("accurate");
    let merged = merge_revision_set(&source, &set, COORD, Some(day(2)), None)
        .await
        .unwrap();
    assert!(!merged.is_final);
}

#[test]
fn test_is_revision_final() {
    let set = RevisionSet::new(
        "prism",
        vec!["stable".into(), "provisional".into(), "early".into()],
    );
    assert!(is_revision_final(&set, "stable", Some("provisional")).unwrap());
    assert!(is_revision_final(&set, "provisional", Some("provisional")).unwrap());
    assert!(!is_revision_final(&set, "early", Some("provisional")).unwrap());
    assert!(is_revision_final(&set, "early", None).unwrap());
    assert!(is_revision_final(&set, "other", None).is_err());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_unknown_boundary_is_dataset_error() {
    let (set, source) = two_revision_set();
    let err = merge_revision_set(&source, &set, COORD, None, Some("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, DWeatherError::Dataset(_)));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn test_source_error_propagates() {
    let set = RevisionSet::new("rain", vec!["present".into(), "absent".into()]);
    let source = MapSource::new(vec![("present", series(&[(1, 1.0)]))]);
    let err = merge_revision_set(&source, &set, COORD, Some(day(5)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DWeatherError::Dataset(_)));
}
