//! LRU memoization of snapshot metadata.
//!
//! Snapshots are immutable, so a metadata document fetched once stays valid for
//! the lifetime of the process. Shard bytes are passed through uncached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use dweather_common::{DWeatherResult, SnapshotId, SnapshotMetadata};

use crate::store::ContentStore;

/// Metadata cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A [`ContentStore`] wrapper that memoizes `get_metadata` by snapshot id.
pub struct CachedContentStore<S> {
    inner: S,
    metadata: Mutex<LruCache<SnapshotId, SnapshotMetadata>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: ContentStore> CachedContentStore<S> {
    /// Wrap `inner`, keeping at most `capacity` metadata documents (minimum 1).
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            metadata: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.metadata.lock().await.len(),
        }
    }

    pub async fn clear(&self) {
        self.metadata.lock().await.clear();
    }
}

#[async_trait]
impl<S: ContentStore> ContentStore for CachedContentStore<S> {
    async fn get_bytes(&self, id: &SnapshotId, path: &str) -> DWeatherResult<Bytes> {
        self.inner.get_bytes(id, path).await
    }

    async fn get_metadata(&self, id: &SnapshotId) -> DWeatherResult<SnapshotMetadata> {
        if let Some(meta) = self.metadata.lock().await.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("dweather_metadata_cache_hits_total").increment(1);
            return Ok(meta.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dweather_metadata_cache_misses_total").increment(1);
        debug!(id = %id, "Metadata cache miss");

        // Lock is not held across the fetch; a concurrent miss on the same id
        // fetches twice and stores identical documents.
        let meta = self.inner.get_metadata(id).await?;
        self.metadata.lock().await.put(id.clone(), meta.clone());
        Ok(meta)
    }
}
