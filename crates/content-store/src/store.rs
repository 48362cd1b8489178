//! Collaborator traits for the snapshot store and the head registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use dweather_common::{
    DWeatherError, DWeatherResult, SnapshotId, SnapshotMetadata, METADATA_FILE,
};

/// Byte-oriented access to immutable snapshots.
///
/// Implementations surface an absent path as [`DWeatherError::NotFound`], transport
/// failures as [`DWeatherError::Io`] and elapsed per-call deadlines as
/// [`DWeatherError::Timeout`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the bytes of `path` inside snapshot `id`.
    async fn get_bytes(&self, id: &SnapshotId, path: &str) -> DWeatherResult<Bytes>;

    /// Fetch and parse the metadata document of snapshot `id`.
    ///
    /// An absent metadata document means the snapshot id itself is unresolvable.
    async fn get_metadata(&self, id: &SnapshotId) -> DWeatherResult<SnapshotMetadata> {
        match self.get_bytes(id, METADATA_FILE).await {
            Ok(bytes) => SnapshotMetadata::from_json(&bytes),
            Err(e) if e.is_not_found() => Err(DWeatherError::dataset(format!(
                "snapshot {} is not resolvable",
                id
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Directory of dataset names to their current head snapshot.
#[async_trait]
pub trait HeadRegistry: Send + Sync {
    /// Full dataset-name to head map.
    async fn heads(&self) -> DWeatherResult<HashMap<String, SnapshotId>>;

    /// Head snapshot of one dataset.
    async fn head_of(&self, dataset: &str) -> DWeatherResult<SnapshotId> {
        self.heads()
            .await?
            .remove(dataset)
            .ok_or_else(|| DWeatherError::dataset(format!("{} not found on server", dataset)))
    }
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    async fn get_bytes(&self, id: &SnapshotId, path: &str) -> DWeatherResult<Bytes> {
        (**self).get_bytes(id, path).await
    }

    async fn get_metadata(&self, id: &SnapshotId) -> DWeatherResult<SnapshotMetadata> {
        (**self).get_metadata(id).await
    }
}

#[async_trait]
impl<H: HeadRegistry + ?Sized> HeadRegistry for Arc<H> {
    async fn heads(&self) -> DWeatherResult<HashMap<String, SnapshotId>> {
        (**self).heads().await
    }

    async fn head_of(&self, dataset: &str) -> DWeatherResult<SnapshotId> {
        (**self).head_of(dataset).await
    }
}
