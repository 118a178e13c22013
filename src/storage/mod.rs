//! Content store for uploaded binary assets.
//!
//! The upload path only needs two things from a store: persist a new asset
//! under a collision-free name, and best-effort removal of an asset it
//! previously handed out. Both are expressed by [`ContentStore`] so the
//! pipeline can run against the local filesystem or any other backend.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Upload Intake              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          ContentStore Trait             │
//! │   store(name, bytes) / remove(path)     │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          LocalContentStore              │
//! │  <root>/<ISO-8601 timestamp>-<name>     │
//! └─────────────────────────────────────────┘
//! ```

mod local;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

pub use local::{sanitize_filename, timestamped_name, LocalContentStore, DEFAULT_PUBLIC_PREFIX};

/// An asset persisted by a content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Generated file name (`<timestamp>-<original name>`)
    pub filename: String,

    /// Path reported to clients, e.g. `images/2024-01-01T00:00:00.000Z-cat.png`
    pub path: String,
}

/// Trait for persisting and removing uploaded assets.
///
/// Writes never overwrite an existing asset; removals are expected to be
/// treated as best-effort by callers.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `data` under a fresh name derived from `original_name`.
    async fn store(&self, original_name: &str, data: Bytes) -> Result<StoredAsset, StorageError>;

    /// Remove an asset previously returned by [`ContentStore::store`].
    ///
    /// Accepts the client-facing path (`images/<name>`) or the bare file name.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Local directory holding the assets, when they live on this machine.
    ///
    /// Used to mount the read-only static asset route.
    fn local_root(&self) -> Option<&Path> {
        None
    }
}
