//! Snapshot store backed by `object_store` (HTTP gateway, local mirror, in-memory).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    http::HttpBuilder, local::LocalFileSystem, memory::InMemory, path::Path, ClientOptions,
    ObjectStore,
};
use tracing::{debug, instrument};

use dweather_common::{DWeatherError, DWeatherResult, SnapshotId};

use crate::config::StoreConfig;
use crate::store::{ContentStore, HeadRegistry};

/// Content store over any [`ObjectStore`].
///
/// Snapshot files live at `{snapshot_prefix}/{id}/{path}`; the head registry is
/// the JSON object stored at `heads_path`.
pub struct ObjectContentStore {
    store: Arc<dyn ObjectStore>,
    config: StoreConfig,
    backend: &'static str,
}

impl ObjectContentStore {
    /// Wrap an existing object store.
    pub fn new(store: Arc<dyn ObjectStore>, config: StoreConfig) -> Self {
        Self {
            store,
            config,
            backend: "custom",
        }
    }

    /// Read through an HTTP gateway.
    pub fn http(config: &StoreConfig) -> DWeatherResult<Self> {
        let options = ClientOptions::new().with_timeout(config.request_timeout());
        let store = HttpBuilder::new()
            .with_url(&config.gateway_url)
            .with_client_options(options)
            .build()
            .map_err(|e| {
                DWeatherError::config(format!("Failed to create gateway client: {}", e))
            })?;

        Ok(Self {
            store: Arc::new(store),
            config: config.clone(),
            backend: "http",
        })
    }

    /// Read from a local directory mirroring the gateway layout.
    pub fn local(root: impl AsRef<std::path::Path>, config: &StoreConfig) -> DWeatherResult<Self> {
        let store = LocalFileSystem::new_with_prefix(root.as_ref()).map_err(|e| {
            DWeatherError::config(format!(
                "Failed to open local mirror {}: {}",
                root.as_ref().display(),
                e
            ))
        })?;

        Ok(Self {
            store: Arc::new(store),
            config: config.clone(),
            backend: "local",
        })
    }

    /// Empty in-memory store, populated through [`ObjectContentStore::put_file`].
    pub fn in_memory(config: &StoreConfig) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            config: config.clone(),
            backend: "memory",
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn snapshot_path(&self, id: &SnapshotId, path: &str) -> Path {
        let prefix = self.config.snapshot_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            Path::from(format!("{}/{}", id, path))
        } else {
            Path::from(format!("{}/{}/{}", prefix, id, path))
        }
    }

    fn heads_location(&self) -> Path {
        Path::from(self.config.heads_path.trim_matches('/'))
    }

    /// Run a store call under the configured per-call timeout.
    async fn with_timeout<T, F>(&self, location: &Path, fut: F) -> DWeatherResult<T>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(object_store::Error::NotFound { .. })) => Err(DWeatherError::NotFound {
                id: String::new(),
                path: location.to_string(),
            }),
            Ok(Err(e)) => Err(DWeatherError::io(format!(
                "Failed to read {}: {}",
                location, e
            ))),
            Err(_) => Err(DWeatherError::Timeout(format!(
                "{} after {}s",
                location, self.config.request_timeout_secs
            ))),
        }
    }

    async fn read(&self, location: &Path) -> DWeatherResult<Bytes> {
        self.with_timeout(location, async {
            let result = self.store.get(location).await?;
            result.bytes().await
        })
        .await
    }

    /// Write a file under a snapshot. Used to seed local mirrors and test stores.
    #[instrument(skip(self, data), fields(backend = self.backend, id = %id, path = %path))]
    pub async fn put_file(&self, id: &SnapshotId, path: &str, data: Bytes) -> DWeatherResult<()> {
        let location = self.snapshot_path(id, path);
        debug!(size = data.len(), "Writing snapshot file");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| DWeatherError::io(format!("Failed to write {}: {}", location, e)))?;

        Ok(())
    }

    /// Replace the head registry document.
    pub async fn put_heads(&self, heads: &HashMap<String, SnapshotId>) -> DWeatherResult<()> {
        let body = serde_json::to_vec(heads)?;
        let location = self.heads_location();

        self.store
            .put(&location, Bytes::from(body).into())
            .await
            .map_err(|e| DWeatherError::io(format!("Failed to write {}: {}", location, e)))?;

        Ok(())
    }
}

#[async_trait]
impl ContentStore for ObjectContentStore {
    #[instrument(skip(self), fields(backend = self.backend, id = %id, path = %path))]
    async fn get_bytes(&self, id: &SnapshotId, path: &str) -> DWeatherResult<Bytes> {
        let location = self.snapshot_path(id, path);
        metrics::counter!("dweather_store_requests_total", "op" => "get_bytes").increment(1);

        match self.read(&location).await {
            Ok(bytes) => {
                debug!(size = bytes.len(), "Read snapshot file");
                Ok(bytes)
            }
            Err(DWeatherError::NotFound { .. }) => Err(DWeatherError::not_found(id.as_str(), path)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl HeadRegistry for ObjectContentStore {
    #[instrument(skip(self), fields(backend = self.backend))]
    async fn heads(&self) -> DWeatherResult<HashMap<String, SnapshotId>> {
        let location = self.heads_location();
        metrics::counter!("dweather_store_requests_total", "op" => "heads").increment(1);

        let bytes = match self.read(&location).await {
            Ok(bytes) => bytes,
            Err(DWeatherError::NotFound { .. }) => {
                return Err(DWeatherError::dataset(format!(
                    "head registry {} not found",
                    location
                )))
            }
            Err(e) => return Err(e),
        };

        let heads: HashMap<String, SnapshotId> = serde_json::from_slice(&bytes)?;
        debug!(datasets = heads.len(), "Loaded head registry");
        Ok(heads)
    }
}
