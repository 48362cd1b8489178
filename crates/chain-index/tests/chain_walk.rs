//! Chain traversal against in-memory snapshot chains.

use async_trait::async_trait;
use bytes::Bytes;
use chain_index::ChainIndex;
use chrono::{NaiveDate, TimeZone, Utc};
use content_store::ContentStore;
use dweather_common::{DWeatherError, DWeatherResult, SnapshotId};
use test_utils::{MetadataBuilder, TestStore};

fn ids(snapshots: &[dweather_common::Snapshot]) -> Vec<&str> {
    snapshots.iter().map(|s| s.id.as_str()).collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn three_link_chain() -> TestStore {
    let mut store = TestStore::new();
    store
        .chain(
            "demo-daily",
            vec![
                (
                    "h1",
                    MetadataBuilder::new("2020-01-01", "2020-01-31").generated("2020-02-01T00:00:00"),
                ),
                (
                    "h2",
                    MetadataBuilder::new("2020-02-01", "2020-02-29").generated("2020-03-01T00:00:00"),
                ),
                (
                    "h3",
                    MetadataBuilder::new("2020-03-01", "2020-03-31").generated("2020-04-01T00:00:00"),
                ),
            ],
        )
        .await;
    store
}

// ============================================================================
// walk
// ============================================================================

#[tokio::test]
async fn test_walk_returns_oldest_first() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let chain = index.walk(&SnapshotId::new("h3")).await.unwrap();
    assert_eq!(ids(&chain), vec!["h1", "h2", "h3"]);
    assert!(chain[0].is_root());
}

#[tokio::test]
async fn test_walk_from_middle() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let chain = index.walk(&SnapshotId::new("h2")).await.unwrap();
    assert_eq!(ids(&chain), vec!["h1", "h2"]);
}

#[tokio::test]
async fn test_walk_single_root() {
    let mut store = TestStore::new();
    store
        .chain("solo-daily", vec![("only", MetadataBuilder::new("2020-01-01", "2020-01-02"))])
        .await;
    let index = ChainIndex::new(store.store.as_ref());

    let chain = index.walk(&SnapshotId::new("only")).await.unwrap();
    assert_eq!(ids(&chain), vec!["only"]);
}

#[tokio::test]
async fn test_snapshot_ids() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let chain = index.snapshot_ids(&SnapshotId::new("h3")).await.unwrap();
    assert_eq!(
        chain,
        vec![SnapshotId::new("h1"), SnapshotId::new("h2"), SnapshotId::new("h3")]
    );
}

#[tokio::test]
async fn test_unresolvable_predecessor_is_dataset_error() {
    let store = TestStore::new();
    store
        .add_snapshot(
            "orphan",
            &MetadataBuilder::new("2020-01-01", "2020-01-02").previous(Some("gone")),
        )
        .await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index.walk(&SnapshotId::new("orphan")).await.unwrap_err();
    assert!(matches!(err, DWeatherError::Dataset(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unknown_head_is_dataset_error() {
    let store = TestStore::new();
    let index = ChainIndex::new(store.store.as_ref());

    let err = index.walk(&SnapshotId::new("nothing")).await.unwrap_err();
    assert!(matches!(err, DWeatherError::Dataset(_)));
}

#[tokio::test]
async fn test_cycle_is_corrupt_chain() {
    let store = TestStore::new();
    store
        .add_snapshot(
            "a",
            &MetadataBuilder::new("2020-01-01", "2020-01-02").previous(Some("b")),
        )
        .await;
    store
        .add_snapshot(
            "b",
            &MetadataBuilder::new("2020-01-03", "2020-01-04").previous(Some("a")),
        )
        .await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index.walk(&SnapshotId::new("a")).await.unwrap_err();
    assert!(matches!(err, DWeatherError::CorruptChain(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_self_loop_is_corrupt_chain() {
    let store = TestStore::new();
    store
        .add_snapshot(
            "loop",
            &MetadataBuilder::new("2020-01-01", "2020-01-02").previous(Some("loop")),
        )
        .await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index
        .resolve_for_date(&SnapshotId::new("loop"), date(2019, 6, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DWeatherError::CorruptChain(_)));
}

// ============================================================================
// walk_as_of
// ============================================================================

#[tokio::test]
async fn test_walk_as_of_excludes_later_snapshots() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());
    let cutoff = Utc.with_ymd_and_hms(2020, 3, 15, 0, 0, 0).unwrap();

    let chain = index.walk_as_of(&SnapshotId::new("h3"), cutoff).await.unwrap();
    assert_eq!(ids(&chain), vec!["h1", "h2"]);
}

#[tokio::test]
async fn test_walk_as_of_inclusive_cutoff() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());
    let cutoff = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();

    let chain = index.walk_as_of(&SnapshotId::new("h3"), cutoff).await.unwrap();
    assert_eq!(ids(&chain), vec!["h1", "h2"]);
}

#[tokio::test]
async fn test_walk_as_of_traverses_past_excluded() {
    // A republished middle snapshot generated after the head must not stop traversal.
    let mut store = TestStore::new();
    store
        .chain(
            "demo-daily",
            vec![
                (
                    "old",
                    MetadataBuilder::new("2020-01-01", "2020-01-31").generated("2020-02-01T00:00:00"),
                ),
                (
                    "late",
                    MetadataBuilder::new("2020-02-01", "2020-02-29").generated("2020-09-01T00:00:00"),
                ),
                (
                    "head",
                    MetadataBuilder::new("2020-03-01", "2020-03-31").generated("2020-04-01T00:00:00"),
                ),
            ],
        )
        .await;
    let index = ChainIndex::new(store.store.as_ref());
    let cutoff = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap();

    let chain = index.walk_as_of(&SnapshotId::new("head"), cutoff).await.unwrap();
    assert_eq!(ids(&chain), vec!["old", "head"]);
}

#[tokio::test]
async fn test_walk_as_of_before_everything_is_empty() {
    let store = three_link_chain().await;
    let index = ChainIndex::new(store.store.as_ref());
    let cutoff = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();

    let chain = index.walk_as_of(&SnapshotId::new("h3"), cutoff).await.unwrap();
    assert!(chain.is_empty());
}

// ============================================================================
// resolve_for_date
// ============================================================================

async fn forecast_chain() -> TestStore {
    let mut store = TestStore::new();
    store
        .chain(
            "gfs_tmax-hourly",
            vec![
                ("f1", MetadataBuilder::new("2021-01-01", "2021-01-10")),
                // gap: 2021-01-11 .. 2021-01-14
                ("f2", MetadataBuilder::new("2021-01-15", "2021-01-20")),
                (
                    "f3",
                    MetadataBuilder::new("2021-01-21", "2021-01-31")
                        .full_range("2021-01-01", "2021-01-31"),
                ),
            ],
        )
        .await;
    store
}

#[tokio::test]
async fn test_resolve_head_covers_date() {
    let store = forecast_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let snap = index
        .resolve_for_date(&SnapshotId::new("f3"), date(2021, 1, 25))
        .await
        .unwrap();
    assert_eq!(snap.id.as_str(), "f3");
}

#[tokio::test]
async fn test_resolve_walks_back() {
    let store = forecast_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let snap = index
        .resolve_for_date(&SnapshotId::new("f3"), date(2021, 1, 1))
        .await
        .unwrap();
    assert_eq!(snap.id.as_str(), "f1");
}

#[tokio::test]
async fn test_resolve_earlier_than_available() {
    let store = forecast_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index
        .resolve_for_date(&SnapshotId::new("f3"), date(2020, 12, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, DWeatherError::DateOutOfRange(_)));
    assert!(err.to_string().contains("earlier than available data"));
}

#[tokio::test]
async fn test_resolve_later_than_available() {
    let store = forecast_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index
        .resolve_for_date(&SnapshotId::new("f3"), date(2021, 2, 1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("later than available data"));
}

#[tokio::test]
async fn test_resolve_hole_in_coverage() {
    let store = forecast_chain().await;
    let index = ChainIndex::new(store.store.as_ref());

    let err = index
        .resolve_for_date(&SnapshotId::new("f3"), date(2021, 1, 12))
        .await
        .unwrap_err();
    assert!(matches!(err, DWeatherError::DateOutOfRange(_)));
    assert!(err.to_string().contains("hole in coverage"));
}

#[tokio::test]
async fn test_resolve_without_full_range_uses_walked_bounds() {
    let mut store = TestStore::new();
    store
        .chain(
            "ecmwf-daily",
            vec![
                ("e1", MetadataBuilder::new("2021-01-01", "2021-01-10")),
                ("e2", MetadataBuilder::new("2021-01-15", "2021-01-20")),
            ],
        )
        .await;
    let index = ChainIndex::new(store.store.as_ref());
    let head = SnapshotId::new("e2");

    let err = index.resolve_for_date(&head, date(2020, 6, 1)).await.unwrap_err();
    assert!(err.to_string().contains("earlier than available data"));

    let err = index.resolve_for_date(&head, date(2021, 1, 12)).await.unwrap_err();
    assert!(err.to_string().contains("hole in coverage"));
}

// ============================================================================
// Transport failures
// ============================================================================

/// Store whose every call times out.
struct TimingOutStore;

#[async_trait]
impl ContentStore for TimingOutStore {
    async fn get_bytes(&self, _id: &SnapshotId, path: &str) -> DWeatherResult<Bytes> {
        Err(DWeatherError::Timeout(path.to_string()))
    }
}

#[tokio::test]
async fn test_timeout_propagates_as_retryable() {
    let store = TimingOutStore;
    let index = ChainIndex::new(&store);

    let err = index.walk(&SnapshotId::new("h3")).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, DWeatherError::Timeout(_)));
}
