use crate::error::StorageError;
use crate::ports::storage::StoragePort;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Typed facade over a [`StoragePort`] that also knows how keys map to
/// public CDN URLs.
pub struct StorageGateway<S> {
    backend: S,
    cdn_base_url: String,
}

impl<S: StoragePort> StorageGateway<S> {
    pub fn new(backend: S, cdn_base_url: impl Into<String>) -> Self {
        Self {
            backend,
            cdn_base_url: cdn_base_url.into(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn url_for(&self, key: &str) -> String {
        crate::domain::hls::cdn_url(&self.cdn_base_url, key)
    }

    /// Downloads `key` into `dest_dir` as `source.<ext>`, keeping the
    /// extension so probing sees the same container hint.
    pub async fn download(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, StorageError> {
        let file_name = match Path::new(key).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("source.{ext}"),
            _ => String::from("source"),
        };
        let local_path = dest_dir.join(file_name);

        self.backend
            .download(key, &local_path)
            .await
            .map_err(|source| StorageError::Backend {
                operation: "download",
                key: key.to_string(),
                source,
            })?;
        debug!(key, path = %local_path.display(), "downloaded source");
        Ok(local_path)
    }

    /// Uploads one file and returns its public URL.
    pub async fn upload(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        self.backend
            .upload(local_path, key)
            .await
            .map_err(|source| StorageError::Backend {
                operation: "upload",
                key: key.to_string(),
                source,
            })?;
        Ok(self.url_for(key))
    }

    /// Uploads files one by one under `prefix`, keyed by file name.
    ///
    /// Not atomic: a failure part-way leaves the earlier files in place.
    pub async fn upload_all(&self, files: &[PathBuf], prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::with_capacity(files.len());
        for path in files {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| StorageError::Io {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "file has no usable name",
                    ),
                })?;
            let key = format!("{}/{}", prefix.trim_end_matches('/'), name);
            self.upload(path, &key).await?;
            keys.push(key);
        }
        debug!(prefix, count = keys.len(), "uploaded directory");
        Ok(keys)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.backend
            .delete(key)
            .await
            .map_err(|source| StorageError::Backend {
                operation: "delete",
                key: key.to_string(),
                source,
            })
    }

    /// Deletes every object under `prefix` and returns how many were removed.
    pub async fn purge_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let listing_prefix = format!("{}/", prefix.trim_end_matches('/'));
        let keys = self
            .backend
            .list(&listing_prefix)
            .await
            .map_err(|source| StorageError::Backend {
                operation: "list",
                key: listing_prefix.clone(),
                source,
            })?;
        for key in &keys {
            self.delete(key).await?;
        }
        Ok(keys.len())
    }
}
