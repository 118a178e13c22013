//! Local filesystem content store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StorageError;

use super::{ContentStore, StoredAsset};

/// Prefix of the paths handed back to clients (`images/<filename>`).
pub const DEFAULT_PUBLIC_PREFIX: &str = "images";

/// Name used when the client-supplied file name has no usable component.
const FALLBACK_FILENAME: &str = "upload";

/// Stores assets as flat files in a single directory.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Io(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
        })
    }

    /// Override the prefix used in client-facing paths.
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    /// Get the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a client-facing path to a file inside the root.
    ///
    /// Only flat names are valid: anything that could address a file outside
    /// the root directory is rejected. Dots inside a name (`my..photo.png`)
    /// are fine, the name just cannot be `.` or `..` itself.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let prefix = format!("{}/", self.public_prefix);
        let name = path.strip_prefix(&prefix).unwrap_or(path);

        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(name))
    }

    async fn create_new(&self, filename: &str) -> std::io::Result<fs::File> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.root.join(filename))
            .await
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn store(&self, original_name: &str, data: Bytes) -> Result<StoredAsset, StorageError> {
        let now = Utc::now();
        let name = sanitize_filename(original_name);
        let mut filename = timestamped_name(now, &name);

        let mut file = match self.create_new(&filename).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Same millisecond, same name: keep both
                let suffix = Uuid::new_v4().simple().to_string();
                filename = timestamped_name(now, &format!("{}-{}", &suffix[..8], name));
                debug!(filename = %filename, "Timestamp collision, using suffixed name");
                self.create_new(&filename).await?
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_contents(&mut file, &data).await {
            drop(file);
            discard_partial(&self.root.join(&filename)).await;
            return Err(e.into());
        }

        let path = format!("{}/{}", self.public_prefix, filename);

        info!(
            path = %path,
            size_bytes = data.len(),
            "Stored uploaded file"
        );

        Ok(StoredAsset { filename, path })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;

        match fs::remove_file(&target).await {
            Ok(()) => {
                info!(path = %path, "Removed stored file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

async fn write_contents(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.sync_all().await
}

/// Remove a file whose write failed part way, so no truncated asset stays
/// reachable under the public prefix.
async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Discarded partially written file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "Failed to discard partially written file"
        ),
    }
}

/// Build `<ISO-8601 timestamp>-<name>` for the given instant.
///
/// The timestamp uses millisecond precision in UTC, e.g.
/// `2024-05-01T09:30:00.123Z-cat.png`.
pub fn timestamped_name(at: DateTime<Utc>, name: &str) -> String {
    format!("{}-{}", at.to_rfc3339_opts(SecondsFormat::Millis, true), name)
}

/// Reduce a client-supplied file name to its final path component.
pub fn sanitize_filename(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        last.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
