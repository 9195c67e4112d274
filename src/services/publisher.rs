use crate::api::error::AppError;
use crate::services::staging::StagedFile;
use crate::services::storage::StorageService;
use crate::utils::keys::PublishKey;
use std::sync::Arc;

/// Where a published object can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicReference {
    pub key: String,
    pub url: String,
}

/// Uploads finalized staged files and resolves their public URL against a
/// fixed base (CDN distribution or the storage endpoint itself).
pub struct ObjectPublisher {
    storage: Arc<dyn StorageService>,
    base_url: String,
}

impl ObjectPublisher {
    pub fn new(storage: Arc<dyn StorageService>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { storage, base_url }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// No retry here; a failed put surfaces as `StorageUnavailable`.
    pub async fn publish(
        &self,
        staged: &StagedFile,
        key: &PublishKey,
        content_type: &str,
    ) -> Result<PublicReference, AppError> {
        let key = key.to_string();
        tracing::info!(
            "Publishing {} bytes as {} ({})",
            staged.size(),
            key,
            content_type
        );

        self.storage
            .put_file(&key, staged.path(), content_type)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("put {} failed: {:#}", key, e)))?;

        Ok(PublicReference {
            url: self.url_for(&key),
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::staging::StagingStore;
    use crate::services::storage::LocalStorageService;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_publish_to_local_backend() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorageService::new(root.path()));
        let publisher = ObjectPublisher::new(storage.clone(), "http://localhost:8091/assets/");

        let staging = StagingStore::new(Some(scratch.path().to_path_buf()));
        let staged = staging.stage(&b"jpeg bytes"[..], 1024, ".jpg").await.unwrap();

        let key = PublishKey::generate(None, "jpg");
        let reference = publisher.publish(&staged, &key, "image/jpeg").await.unwrap();

        assert_eq!(reference.key, key.to_string());
        assert_eq!(
            reference.url,
            format!("http://localhost:8091/assets/{}.jpg", key.id())
        );
        assert_eq!(storage.get_file(&reference.key).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_publish_failure_is_storage_unavailable() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorageService::new(root.path()));
        let publisher = ObjectPublisher::new(storage, "http://cdn.example.com");

        let staging = StagingStore::new(Some(scratch.path().to_path_buf()));
        let staged = staging.reserve("").unwrap();
        let path = staged.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();

        let err = publisher
            .publish(&staged, &PublishKey::generate(None, "png"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable(_)));
    }
}
