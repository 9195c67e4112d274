use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Durable object storage. Objects become visible all at once or not at all.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stream the file at `path` into `key` with the given content type
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;
    async fn get_file(&self, key: &str) -> Result<Vec<u8>>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open {} for upload", path.display()))?;

        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                key,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let data = res.body.collect().await?.to_vec();
        Ok(data)
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!(service_error))
                }
            }
        }
    }
}

/// Filesystem-backed object store rooted at an assets directory
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(anyhow!("Invalid object key: {}", key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<()> {
        let target = self.object_path(key)?;
        let parent = target
            .parent()
            .ok_or_else(|| anyhow!("Object key has no parent: {}", key))?;
        tokio::fs::create_dir_all(parent).await?;

        // Copy next to the target, then rename, so readers never see a partial object
        let partial = parent.join(format!(".partial-{}", Uuid::new_v4()));
        if let Err(e) = tokio::fs::copy(path, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.object_path(key)?).await?)
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.object_path(key)?).await?)
    }
}
