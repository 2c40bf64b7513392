use async_trait::async_trait;
use std::error::Error;
use std::path::Path;

/// Object storage keyed by slash-separated paths.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Download an object to a local path
    async fn download(
        &self,
        key: &str,
        local_path: &Path,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Upload a local file, overwriting any object at `key`
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Keys under `prefix`, in no particular order
    async fn list(&self, prefix: &str) -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;
}
