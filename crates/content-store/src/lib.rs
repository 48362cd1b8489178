//! Access to content-addressed dataset snapshots.
//!
//! Provides:
//! - [`ContentStore`] / [`HeadRegistry`]: the collaborator contracts the read path consumes
//! - [`ObjectContentStore`]: an `object_store` implementation (HTTP gateway, local mirror, memory)
//! - [`CachedContentStore`]: LRU memoization of immutable snapshot metadata
//! - [`archive`]: gzip, tar and zip member extraction

pub mod archive;
pub mod cache;
pub mod config;
pub mod object_store;
pub mod store;

pub use self::object_store::ObjectContentStore;
pub use cache::{CacheStats, CachedContentStore};
pub use config::StoreConfig;
pub use store::{ContentStore, HeadRegistry};
