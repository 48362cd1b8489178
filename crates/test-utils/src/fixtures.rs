//! Snapshot fixtures: metadata documents and in-memory chains.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{json, Map, Value};

use content_store::{ObjectContentStore, StoreConfig};
use dweather_common::SnapshotId;

/// Common grid definitions as published in metadata.
pub mod grid {
    /// CHIRPS 0.05 degree global band.
    pub const CHIRPS_05_LAT: [f64; 2] = [-49.975, 49.975];
    pub const CHIRPS_05_LON: [f64; 2] = [-179.975, 179.975];
    pub const CHIRPS_05_RES: f64 = 0.05;

    /// CPC 0.5 degree grid in shifted longitude.
    pub const CPC_LAT: [f64; 2] = [-89.75, 89.75];
    pub const CPC_LON: [f64; 2] = [0.25, 359.75];
    pub const CPC_RES: f64 = 0.5;

    /// PRISM 4km CONUS grid.
    pub const PRISM_LAT: [f64; 2] = [24.083333, 49.916667];
    pub const PRISM_LON: [f64; 2] = [-125.0, -66.5];
    pub const PRISM_RES: f64 = 0.041667;
}

/// Builder for `metadata.json` documents.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    doc: Map<String, Value>,
}

impl MetadataBuilder {
    /// A snapshot covering `[start, end]`, generated at 2021-01-01 with no predecessor.
    pub fn new(start: &str, end: &str) -> Self {
        let mut doc = Map::new();
        doc.insert("date range".into(), json!([start, end]));
        doc.insert("time generated".into(), json!("2021-01-01T00:00:00"));
        doc.insert("previous hash".into(), Value::Null);
        Self { doc }
    }

    pub fn generated(mut self, timestamp: &str) -> Self {
        self.doc.insert("time generated".into(), json!(timestamp));
        self
    }

    pub fn previous(mut self, id: Option<&str>) -> Self {
        self.doc.insert("previous hash".into(), json!(id));
        self
    }

    pub fn full_range(mut self, start: &str, end: &str) -> Self {
        self.doc.insert("full date range".into(), json!([start, end]));
        self
    }

    pub fn grid(mut self, lat_range: [f64; 2], lon_range: [f64; 2], resolution: f64) -> Self {
        self.doc.insert("latitude range".into(), json!(lat_range));
        self.doc.insert("longitude range".into(), json!(lon_range));
        self.doc.insert("resolution".into(), json!(resolution));
        self
    }

    pub fn missing(mut self, value: Value) -> Self {
        self.doc.insert("missing value".into(), value);
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.doc.insert("unit of measurement".into(), json!(unit));
        self
    }

    pub fn filename_precision(mut self, precision: u32) -> Self {
        self.doc
            .insert("filename decimal precision".into(), json!(precision));
        self
    }

    /// Set any other key of the document.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.doc.insert(key.into(), value);
        self
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.doc.get("previous hash"), Some(Value::String(_)))
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.doc.clone()).to_string()
    }
}

/// In-memory store with helpers to lay out chains and shards.
pub struct TestStore {
    pub store: Arc<ObjectContentStore>,
    heads: HashMap<String, SnapshotId>,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(ObjectContentStore::in_memory(&StoreConfig::default())),
            heads: HashMap::new(),
        }
    }

    /// Store one snapshot's metadata exactly as given.
    pub async fn add_snapshot(&self, id: &str, metadata: &MetadataBuilder) {
        self.add_file(id, "metadata.json", metadata.to_json().into_bytes())
            .await;
    }

    /// Store an arbitrary file under a snapshot.
    pub async fn add_file(&self, id: &str, path: &str, data: Vec<u8>) {
        self.store
            .put_file(&SnapshotId::new(id), path, Bytes::from(data))
            .await
            .expect("writing to the in-memory store");
    }

    /// Point a dataset name at a head snapshot.
    pub async fn set_head(&mut self, dataset: &str, id: &str) {
        self.heads.insert(dataset.to_string(), SnapshotId::new(id));
        self.store
            .put_heads(&self.heads)
            .await
            .expect("writing the head registry");
    }

    /// Store snapshots given oldest first, linking each to its predecessor, and make
    /// the last one the dataset head. Explicit `previous` links in a builder are kept.
    pub async fn chain(&mut self, dataset: &str, snapshots: Vec<(&str, MetadataBuilder)>) {
        let mut previous: Option<String> = None;
        let mut last = None;
        for (id, builder) in snapshots {
            let builder = if builder.has_previous() {
                builder
            } else {
                builder.previous(previous.as_deref())
            };
            self.add_snapshot(id, &builder).await;
            previous = Some(id.to_string());
            last = Some(id.to_string());
        }
        if let Some(head) = last {
            self.set_head(dataset, &head).await;
        }
    }
}
